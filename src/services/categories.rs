use crate::{
    db::DbPool,
    entities::category::{self, Column as CategoryColumn, Entity as Category},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

const DEPTH_MARKER: &str = "--";

/// Sort order of the category list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Anything other than `desc` sorts ascending.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(dir) if dir.eq_ignore_ascii_case("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    pub fn reverse(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Category form submission
#[derive(Debug, Clone, Default, Validate)]
pub struct CategoryInput {
    pub id: Option<i32>,
    #[validate(length(
        min = 1,
        max = 128,
        message = "Category name must be between 1 and 128 characters"
    ))]
    pub name: String,
    #[validate(length(max = 64, message = "Alias cannot exceed 64 characters"))]
    pub alias: String,
    pub parent_id: Option<i32>,
    pub enabled: bool,
    /// Sanitized name of a newly uploaded image
    pub image: Option<String>,
}

/// One entry of the parent-category dropdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOption {
    pub id: i32,
    pub label: String,
    pub depth: usize,
}

/// Flattens categories into depth-first form order.
///
/// Siblings are sorted by name and each label carries one `--` per level.
/// Categories whose parent chain never reaches a root are skipped.
pub fn build_category_tree(categories: &[category::Model]) -> Vec<CategoryOption> {
    let mut by_parent: HashMap<Option<i32>, Vec<&category::Model>> = HashMap::new();
    for cat in categories {
        by_parent.entry(cat.parent_id).or_default().push(cat);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
    }

    let mut options = Vec::with_capacity(categories.len());
    let mut stack: Vec<(&category::Model, usize)> = by_parent
        .get(&None)
        .map(|roots| roots.iter().rev().map(|c| (*c, 0)).collect())
        .unwrap_or_default();

    while let Some((cat, depth)) = stack.pop() {
        options.push(CategoryOption {
            id: cat.id,
            label: format!("{}{}", DEPTH_MARKER.repeat(depth), cat.name),
            depth,
        });
        if let Some(children) = by_parent.get(&Some(cat.id)) {
            stack.extend(children.iter().rev().map(|c| (*c, depth + 1)));
        }
    }

    options
}

/// True when making `new_parent` the parent of `id` would close a loop.
fn creates_cycle(parents: &HashMap<i32, Option<i32>>, id: i32, new_parent: i32) -> bool {
    let mut current = Some(new_parent);
    let mut steps = 0;
    while let Some(cur) = current {
        if cur == id {
            return true;
        }
        steps += 1;
        if steps > parents.len() {
            // Stored data already loops; refuse rather than spin.
            return true;
        }
        current = parents.get(&cur).copied().flatten();
    }
    false
}

const ALIAS_MAX_CHARS: usize = 64;

/// A typed alias is kept as is; one derived from the name is cut to the column width.
fn derive_alias(alias: &str, name: &str) -> String {
    if alias.trim().is_empty() {
        name.trim()
            .chars()
            .take(ALIAS_MAX_CHARS)
            .collect::<String>()
            .replace(' ', "-")
    } else {
        alias.trim().replace(' ', "-")
    }
}

/// Service for managing categories
#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// All categories sorted by name
    #[instrument(skip(self))]
    pub async fn list_all(
        &self,
        sort_dir: SortDirection,
    ) -> Result<Vec<category::Model>, ServiceError> {
        let db = &*self.db_pool;
        let query = match sort_dir {
            SortDirection::Asc => Category::find().order_by_asc(CategoryColumn::Name),
            SortDirection::Desc => Category::find().order_by_desc(CategoryColumn::Name),
        };
        Ok(query.all(db).await?)
    }

    /// Every reachable category in hierarchical dropdown order
    #[instrument(skip(self))]
    pub async fn list_categories_used_in_form(&self) -> Result<Vec<CategoryOption>, ServiceError> {
        let db = &*self.db_pool;
        let categories = Category::find().all(db).await?;
        Ok(build_category_tree(&categories))
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<category::Model, ServiceError> {
        let db = &*self.db_pool;
        Category::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    /// Inserts or updates a category. Without a new image the stored one is kept.
    #[instrument(skip(self))]
    pub async fn save(&self, mut input: CategoryInput) -> Result<category::Model, ServiceError> {
        let db = &*self.db_pool;
        input.name = input.name.trim().to_string();
        input.alias = derive_alias(&input.alias, &input.name);
        input.validate()?;

        let mut duplicate = Category::find().filter(CategoryColumn::Name.eq(input.name.as_str()));
        if let Some(id) = input.id {
            duplicate = duplicate.filter(CategoryColumn::Id.ne(id));
        }
        if duplicate.count(db).await? > 0 {
            return Err(ServiceError::ValidationError(format!(
                "There is another category having the name {}",
                input.name
            )));
        }

        if let Some(parent_id) = input.parent_id {
            let parents: HashMap<i32, Option<i32>> = Category::find()
                .all(db)
                .await?
                .into_iter()
                .map(|c| (c.id, c.parent_id))
                .collect();

            if !parents.contains_key(&parent_id) {
                return Err(ServiceError::ValidationError(format!(
                    "Parent category with ID {} does not exist",
                    parent_id
                )));
            }
            if let Some(id) = input.id {
                if creates_cycle(&parents, id, parent_id) {
                    return Err(ServiceError::ValidationError(
                        "A category cannot be its own parent or the child of a subcategory"
                            .to_string(),
                    ));
                }
            }
        }

        let saved = match input.id {
            Some(id) => {
                let existing = self.get(id).await?;
                let mut active: category::ActiveModel = existing.into();
                active.name = Set(input.name);
                active.alias = Set(input.alias);
                active.enabled = Set(input.enabled);
                active.parent_id = Set(input.parent_id);
                if let Some(image) = input.image {
                    active.image = Set(Some(image));
                }
                active.update(db).await?
            }
            None => {
                category::ActiveModel {
                    name: Set(input.name),
                    alias: Set(input.alias),
                    enabled: Set(input.enabled),
                    parent_id: Set(input.parent_id),
                    image: Set(input.image),
                    ..Default::default()
                }
                .insert(db)
                .await?
            }
        };

        info!(category_id = saved.id, name = %saved.name, "Category saved");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn update_enabled_status(&self, id: i32, enabled: bool) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let existing = self.get(id).await?;
        let mut active: category::ActiveModel = existing.into();
        active.enabled = Set(enabled);
        active.update(db).await?;
        info!(category_id = id, enabled, "Category status updated");
        Ok(())
    }

    /// Deletes a leaf category. Categories with children are refused.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        self.get(id).await?;

        let children = Category::find()
            .filter(CategoryColumn::ParentId.eq(id))
            .count(db)
            .await?;
        if children > 0 {
            return Err(ServiceError::ValidationError(format!(
                "The category ID {} has {} subcategories and cannot be deleted",
                id, children
            )));
        }

        Category::delete_by_id(id).exec(db).await?;
        info!(category_id = id, "Category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn cat(id: i32, name: &str, parent_id: Option<i32>) -> category::Model {
        category::Model {
            id,
            name: name.to_string(),
            alias: name.to_string(),
            image: None,
            enabled: true,
            parent_id,
        }
    }

    #[rstest]
    #[case(None, SortDirection::Asc)]
    #[case(Some(""), SortDirection::Asc)]
    #[case(Some("asc"), SortDirection::Asc)]
    #[case(Some("DESC"), SortDirection::Desc)]
    #[case(Some("sideways"), SortDirection::Asc)]
    fn sort_direction_parsing(#[case] raw: Option<&str>, #[case] expected: SortDirection) {
        assert_eq!(SortDirection::parse(raw), expected);
    }

    #[test]
    fn reverse_flips_direction() {
        assert_eq!(SortDirection::Asc.reverse(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.reverse().as_str(), "asc");
    }

    #[test]
    fn tree_is_depth_first_with_sorted_siblings() {
        let categories = vec![
            cat(1, "Electronics", None),
            cat(2, "Computers", None),
            cat(3, "Laptops", Some(2)),
            cat(4, "Desktops", Some(2)),
            cat(5, "Gaming", Some(3)),
            cat(6, "Cameras", Some(1)),
        ];

        let labels: Vec<String> = build_category_tree(&categories)
            .into_iter()
            .map(|o| o.label)
            .collect();

        assert_eq!(
            labels,
            vec![
                "Computers",
                "--Desktops",
                "--Laptops",
                "----Gaming",
                "Electronics",
                "--Cameras",
            ]
        );
    }

    #[test]
    fn tree_skips_orphans_and_loops() {
        let categories = vec![
            cat(1, "Root", None),
            cat(2, "Lost", Some(99)),
            cat(3, "LoopA", Some(4)),
            cat(4, "LoopB", Some(3)),
        ];

        let ids: Vec<i32> = build_category_tree(&categories)
            .into_iter()
            .map(|o| o.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn cycle_detection() {
        let parents: HashMap<i32, Option<i32>> =
            [(1, None), (2, Some(1)), (3, Some(2))].into_iter().collect();

        assert!(creates_cycle(&parents, 1, 1));
        assert!(creates_cycle(&parents, 1, 3));
        assert!(!creates_cycle(&parents, 3, 1));
        assert!(!creates_cycle(&parents, 2, 1));
    }

    #[test]
    fn alias_falls_back_to_name() {
        assert_eq!(derive_alias("", "Home Audio"), "Home-Audio");
        assert_eq!(derive_alias("hifi gear", "Home Audio"), "hifi-gear");
    }

    #[test]
    fn alias_derived_from_long_name_fits_column() {
        let name = "Ä".repeat(100);
        let alias = derive_alias("", &name);
        assert_eq!(alias.chars().count(), ALIAS_MAX_CHARS);

        let typed = "b".repeat(70);
        assert_eq!(derive_alias(&typed, "Books"), typed);
    }

    proptest! {
        #[test]
        fn tree_emits_each_rooted_category_once(parents in proptest::collection::vec(0usize..8, 1..24)) {
            // Entry i gets parent j < i (or none when j == i), so every
            // category is reachable from a root.
            let categories: Vec<category::Model> = parents
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let parent = if i == 0 || p % (i + 1) == i { None } else { Some((p % i) as i32 + 1) };
                    cat(i as i32 + 1, &format!("c{}", i), parent)
                })
                .collect();

            let options = build_category_tree(&categories);
            prop_assert_eq!(options.len(), categories.len());

            let mut ids: Vec<i32> = options.iter().map(|o| o.id).collect();
            ids.sort_unstable();
            ids.dedup();
            prop_assert_eq!(ids.len(), categories.len());

            for option in &options {
                prop_assert!(option.label.starts_with(&DEPTH_MARKER.repeat(option.depth)));
            }
        }
    }
}
