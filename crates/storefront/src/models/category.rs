//! Product categories and the category tree.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chezflora_core::CategoryId;

use super::deserialize_some;

/// A product category. Categories form a tree through `parent_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a category.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    /// Explicit id; derived from the name when absent.
    pub id: Option<CategoryId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub parent_id: Option<CategoryId>,
    /// Sort position among siblings; appended last when absent.
    pub order: Option<i32>,
}

/// Partial update of a category. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` moves the category to the root.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub parent_id: Option<Option<CategoryId>>,
    pub order: Option<i32>,
}

/// Read-only tree queries over a flat list of categories.
#[derive(Debug, Clone, Copy)]
pub struct CategoryTree<'a> {
    categories: &'a [Category],
}

impl<'a> CategoryTree<'a> {
    #[must_use]
    pub const fn new(categories: &'a [Category]) -> Self {
        Self { categories }
    }

    #[must_use]
    pub fn get(&self, id: &CategoryId) -> Option<&'a Category> {
        self.categories.iter().find(|c| &c.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &CategoryId) -> bool {
        self.get(id).is_some()
    }

    /// Root categories, sorted by `order` then name.
    #[must_use]
    pub fn main_categories(&self) -> Vec<&'a Category> {
        self.sorted(|c| c.parent_id.is_none())
    }

    /// Direct children of `parent_id`, sorted by `order` then name.
    #[must_use]
    pub fn children(&self, parent_id: &CategoryId) -> Vec<&'a Category> {
        self.sorted(|c| c.parent_id.as_ref() == Some(parent_id))
    }

    /// The chain of categories from the root down to `id`.
    ///
    /// Walking stops silently at a parent id that does not exist, so a
    /// dangling reference yields a truncated path. An unknown `id` yields an
    /// empty path.
    #[must_use]
    pub fn path(&self, id: &CategoryId) -> Vec<&'a Category> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get(id);

        while let Some(category) = current {
            // Corrupt data can still contain loops.
            if !seen.insert(&category.id) {
                break;
            }
            path.push(category);
            current = category.parent_id.as_ref().and_then(|parent| self.get(parent));
        }

        path.reverse();
        path
    }

    /// Every descendant of `id`, depth-first in sibling order.
    #[must_use]
    pub fn descendant_ids(&self, id: &CategoryId) -> Vec<CategoryId> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id.clone()]);
        self.collect_descendants(id, &mut out, &mut seen);
        out
    }

    fn collect_descendants(
        &self,
        id: &CategoryId,
        out: &mut Vec<CategoryId>,
        seen: &mut HashSet<CategoryId>,
    ) {
        for child in self.children(id) {
            if seen.insert(child.id.clone()) {
                out.push(child.id.clone());
                self.collect_descendants(&child.id, out, seen);
            }
        }
    }

    /// Whether making `new_parent` the parent of `id` would create a cycle.
    ///
    /// True when `id` is found while walking up from `new_parent`, which
    /// includes `new_parent == id`.
    #[must_use]
    pub fn would_create_cycle(&self, id: &CategoryId, new_parent: &CategoryId) -> bool {
        if id == new_parent {
            return true;
        }
        self.path(new_parent).iter().any(|ancestor| &ancestor.id == id)
    }

    /// The `order` for a new child of `parent`: one past the largest sibling.
    #[must_use]
    pub fn next_order(&self, parent: Option<&CategoryId>) -> i32 {
        self.categories
            .iter()
            .filter(|c| c.parent_id.as_ref() == parent)
            .map(|c| c.order)
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    fn sorted(&self, keep: impl Fn(&Category) -> bool) -> Vec<&'a Category> {
        let mut out: Vec<&Category> = self.categories.iter().filter(|c| keep(c)).collect();
        out.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, parent: Option<&str>, order: i32) -> Category {
        let now = Utc::now();
        Category {
            id: CategoryId::new(id),
            name: id.to_uppercase(),
            description: String::new(),
            parent_id: parent.map(CategoryId::new),
            order,
            created_at: now,
            updated_at: now,
        }
    }

    fn sample() -> Vec<Category> {
        vec![
            category("plants", None, 2),
            category("bouquets", None, 1),
            category("roses", Some("bouquets"), 0),
            category("red-roses", Some("roses"), 0),
            category("tulips", Some("bouquets"), 1),
            category("orphan", Some("deleted-parent"), 0),
        ]
    }

    fn ids(categories: &[&Category]) -> Vec<String> {
        categories.iter().map(|c| c.id.to_string()).collect()
    }

    #[test]
    fn test_main_categories_sorted_by_order() {
        let data = sample();
        let tree = CategoryTree::new(&data);
        assert_eq!(ids(&tree.main_categories()), ["bouquets", "plants"]);
    }

    #[test]
    fn test_children() {
        let data = sample();
        let tree = CategoryTree::new(&data);
        assert_eq!(
            ids(&tree.children(&CategoryId::new("bouquets"))),
            ["roses", "tulips"]
        );
        assert!(tree.children(&CategoryId::new("tulips")).is_empty());
    }

    #[test]
    fn test_path_from_root() {
        let data = sample();
        let tree = CategoryTree::new(&data);
        let path = tree.path(&CategoryId::new("red-roses"));
        assert_eq!(ids(&path), ["bouquets", "roses", "red-roses"]);
        assert!(path.first().is_some_and(|c| c.parent_id.is_none()));
    }

    #[test]
    fn test_path_truncates_at_dangling_parent() {
        let data = sample();
        let tree = CategoryTree::new(&data);
        assert_eq!(ids(&tree.path(&CategoryId::new("orphan"))), ["orphan"]);
        assert!(tree.path(&CategoryId::new("missing")).is_empty());
    }

    #[test]
    fn test_descendants_depth_first() {
        let data = sample();
        let tree = CategoryTree::new(&data);
        let descendants: Vec<String> = tree
            .descendant_ids(&CategoryId::new("bouquets"))
            .into_iter()
            .map(CategoryId::into_inner)
            .collect();
        assert_eq!(descendants, ["roses", "red-roses", "tulips"]);
    }

    #[test]
    fn test_cycle_detection() {
        let data = sample();
        let tree = CategoryTree::new(&data);
        let bouquets = CategoryId::new("bouquets");
        assert!(tree.would_create_cycle(&bouquets, &CategoryId::new("red-roses")));
        assert!(tree.would_create_cycle(&bouquets, &bouquets));
        assert!(!tree.would_create_cycle(&CategoryId::new("tulips"), &CategoryId::new("roses")));
    }

    #[test]
    fn test_next_order() {
        let data = sample();
        let tree = CategoryTree::new(&data);
        assert_eq!(tree.next_order(None), 3);
        assert_eq!(tree.next_order(Some(&CategoryId::new("bouquets"))), 2);
        assert_eq!(tree.next_order(Some(&CategoryId::new("tulips"))), 0);
    }
}
