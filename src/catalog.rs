//! Menu tree shaping: slugs, input normalization and item lookup across
//! the category → item hierarchy.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::error::AppError;
use crate::models::{Category, Menu, MenuItem, PriceVariant, SearchGroup};

/// Lowercase, trim, collapse every run of non `[a-z0-9]` characters into a
/// single hyphen, then strip hyphens from both ends.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_hyphen = false;

    for c in value.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Reads a number the way a form would submit it: JSON numbers or numeric
/// strings. Anything else is not a number.
pub fn parse_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;

    number.is_finite().then_some(number)
}

/// Validates a price field: present, numeric and non-negative.
pub fn parse_price(value: &Value) -> Result<f64, AppError> {
    match parse_number(value) {
        Some(price) if price >= 0.0 => Ok(price),
        _ => Err(AppError::validation(
            "Price must be a valid non-negative number",
        )),
    }
}

/// Accepts an array of strings or a comma separated string.
pub fn normalize_tags(tags: &Value) -> Vec<String> {
    let clean = |tag: &str| {
        let tag = tag.trim();
        (!tag.is_empty()).then(|| tag.to_string())
    };

    match tags {
        Value::Array(entries) => entries
            .iter()
            .filter_map(|entry| match entry {
                Value::String(s) => clean(s.as_str()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s.split(',').filter_map(clean).collect(),
        _ => Vec::new(),
    }
}

/// Keeps `{label, price}` entries with a non-empty label and a non-negative
/// numeric price, in their original order.
pub fn normalize_price_variants(variants: &Value) -> Vec<PriceVariant> {
    let Value::Array(entries) = variants else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let label = match entry.get("label") {
                Some(Value::String(s)) => s.trim().to_string(),
                Some(Value::Number(n)) => n.to_string(),
                _ => String::new(),
            };
            let price = entry.get("price").and_then(parse_number)?;

            (!label.is_empty() && price >= 0.0).then_some(PriceVariant { label, price })
        })
        .collect()
}

/// Position of every item in the tree, keyed by item id.
///
/// Built once per loaded menu (O(n)) so mutations resolve an item in O(1)
/// instead of rescanning every category. Any structural change to the tree
/// invalidates it.
#[derive(Debug, Default)]
pub struct ItemIndex {
    positions: HashMap<String, (usize, usize)>,
}

impl ItemIndex {
    pub fn build(menu: &Menu) -> Self {
        let mut positions = HashMap::new();

        for (c, category) in menu.categories.iter().enumerate() {
            for (i, item) in category.items.iter().enumerate() {
                positions.entry(item.id.clone()).or_insert((c, i));
            }
        }

        ItemIndex { positions }
    }

    pub fn contains(&self, item_id: &str) -> bool {
        self.positions.contains_key(item_id)
    }

    pub fn locate(&self, item_id: &str) -> Option<(usize, usize)> {
        self.positions.get(item_id).copied()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Menu {
    pub fn category(&self, category_id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == category_id)
    }

    pub fn item_mut(&mut self, index: &ItemIndex, item_id: &str) -> Option<&mut MenuItem> {
        let (c, i) = index.locate(item_id)?;
        self.categories.get_mut(c)?.items.get_mut(i)
    }

    /// Removes the item wherever it lives. Returns it if something was removed.
    pub fn remove_item(&mut self, index: &ItemIndex, item_id: &str) -> Option<MenuItem> {
        let (c, i) = index.locate(item_id)?;
        let category = self.categories.get_mut(c)?;

        (i < category.items.len()).then(|| category.items.remove(i))
    }

    /// Returns the position of the category, creating an empty one at the end
    /// of the menu when it does not exist yet.
    pub fn ensure_category(&mut self, category_id: &str, name: Option<&str>) -> usize {
        if let Some(position) = self.categories.iter().position(|c| c.id == category_id) {
            return position;
        }

        self.categories.push(Category {
            id: category_id.to_string(),
            name: name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or(category_id)
                .to_string(),
            description: String::new(),
            items: Vec::new(),
        });

        self.categories.len() - 1
    }

    /// Case-insensitive substring match on item name or description, grouped
    /// by category. Categories without a match are left out.
    pub fn search(&self, query: &str) -> Vec<SearchGroup> {
        let needle = query.to_lowercase();

        self.categories
            .iter()
            .filter_map(|category| {
                let items: Vec<MenuItem> = category
                    .items
                    .iter()
                    .filter(|item| {
                        item.name.to_lowercase().contains(&needle)
                            || item.description.to_lowercase().contains(&needle)
                    })
                    .cloned()
                    .collect();

                (!items.is_empty()).then(|| SearchGroup {
                    category_id: category.id.clone(),
                    category_name: category.name.clone(),
                    items,
                })
            })
            .collect()
    }

    /// Every category and item needs a name, and every price must be a
    /// non-negative number.
    pub fn validate(&self) -> Result<(), AppError> {
        for category in &self.categories {
            if category.name.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "Category {} needs a name",
                    category.id
                )));
            }

            for item in &category.items {
                if item.name.trim().is_empty() {
                    return Err(AppError::validation(format!(
                        "Menu item {} needs a name",
                        item.id
                    )));
                }
                if !item.price.is_finite() || item.price < 0.0 {
                    return Err(AppError::validation(format!(
                        "Menu item {} needs a non-negative price",
                        item.id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Category ids and item ids must be unique across the whole document.
    pub fn check_unique_ids(&self) -> Result<(), AppError> {
        let mut categories = HashSet::new();
        let mut items = HashSet::new();

        for category in &self.categories {
            if category.id.is_empty() {
                return Err(AppError::validation("Every category needs an id"));
            }
            if !categories.insert(category.id.as_str()) {
                return Err(AppError::validation(format!(
                    "Duplicate category id: {}",
                    category.id
                )));
            }

            for item in &category.items {
                if item.id.is_empty() {
                    return Err(AppError::validation("Every menu item needs an id"));
                }
                if !items.insert(item.id.as_str()) {
                    return Err(AppError::validation(format!(
                        "Duplicate item id: {}",
                        item.id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Points every item without a back-reference at the category holding it.
    pub fn link_categories(&mut self) {
        for category in &mut self.categories {
            for item in &mut category.items {
                if item.category_id.is_empty() {
                    item.category_id = category.id.clone();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_menu() -> Menu {
        serde_json::from_value(json!({
            "categories": [
                {
                    "id": "subs",
                    "name": "Subs",
                    "items": [
                        { "id": "italian", "name": "Italian Sub", "description": "Salami and ham", "price": 9.5 },
                        { "id": "veggie", "name": "Veggie Sub", "description": "Peppers, onions", "price": 8.0 }
                    ]
                },
                {
                    "id": "sides",
                    "name": "Sides",
                    "items": [
                        { "id": "fries", "name": "Fries", "description": "Crispy", "price": 3.0 }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_validate_menu_document() {
        let menu = sample_menu();
        assert!(menu.validate().is_ok());

        let mut negative = menu.clone();
        negative.categories[1].items[0].price = -0.01;
        assert!(matches!(negative.validate(), Err(AppError::Validation(_))));

        let mut infinite = menu.clone();
        infinite.categories[1].items[0].price = f64::INFINITY;
        assert!(infinite.validate().is_err());

        let mut blank_item = menu.clone();
        blank_item.categories[0].items[1].name = " ".into();
        assert!(blank_item.validate().is_err());

        let mut blank_category = menu;
        blank_category.categories[0].name = String::new();
        assert!(blank_category.validate().is_err());
    }

    #[test]
    fn test_slugify_collapses_punctuation() {
        assert_eq!(slugify("Spicy Chicken!!"), "spicy-chicken");
        assert_eq!(slugify("  Hot & Cold -- Drinks  "), "hot-cold-drinks");
        assert_eq!(slugify("--Breakfast--"), "breakfast");
        assert_eq!(slugify("Café Latte"), "caf-latte");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        for input in ["Spicy Chicken!!", "  A  b  C ", "x--y__z", "Ünïcode Wrap 2"] {
            let once = slugify(input);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn test_normalize_tags_from_string() {
        assert_eq!(
            normalize_tags(&json!(" spicy, ,vegan,  new ")),
            vec!["spicy", "vegan", "new"]
        );
        assert!(normalize_tags(&json!("")).is_empty());
        assert!(normalize_tags(&Value::Null).is_empty());
    }

    #[test]
    fn test_normalize_tags_from_array() {
        assert_eq!(
            normalize_tags(&json!([" hot ", "", "popular"])),
            vec!["hot", "popular"]
        );
    }

    #[test]
    fn test_normalize_price_variants_drops_invalid_entries() {
        let variants = normalize_price_variants(&json!([
            { "label": "Large", "price": 5 },
            { "label": "", "price": 3 },
            { "label": "X", "price": -1 }
        ]));

        assert_eq!(variants, vec![PriceVariant { label: "Large".into(), price: 5.0 }]);
    }

    #[test]
    fn test_normalize_price_variants_keeps_order() {
        let variants = normalize_price_variants(&json!([
            { "label": " Whole ", "price": "12.5" },
            { "label": "Half", "price": "abc" },
            { "label": "Half", "price": 7 },
            { "price": 1 },
            "junk"
        ]));

        assert_eq!(
            variants,
            vec![
                PriceVariant { label: "Whole".into(), price: 12.5 },
                PriceVariant { label: "Half".into(), price: 7.0 },
            ]
        );
        assert!(normalize_price_variants(&json!({ "label": "Large" })).is_empty());
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price(&json!(4.25)).unwrap(), 4.25);
        assert_eq!(parse_price(&json!("0")).unwrap(), 0.0);
        assert!(matches!(parse_price(&json!(-1)), Err(AppError::Validation(_))));
        assert!(matches!(parse_price(&json!("free")), Err(AppError::Validation(_))));
        assert!(matches!(parse_price(&json!(true)), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_item_index_locates_items_across_categories() {
        let menu = sample_menu();
        let index = ItemIndex::build(&menu);

        assert_eq!(index.len(), 3);
        assert_eq!(index.locate("fries"), Some((1, 0)));
        assert_eq!(index.locate("veggie"), Some((0, 1)));
        assert!(!index.contains("missing"));
    }

    #[test]
    fn test_remove_item() {
        let mut menu = sample_menu();
        let index = ItemIndex::build(&menu);

        let removed = menu.remove_item(&index, "italian").unwrap();
        assert_eq!(removed.name, "Italian Sub");
        assert_eq!(menu.categories[0].items.len(), 1);
        assert!(menu.remove_item(&ItemIndex::build(&menu), "italian").is_none());
    }

    #[test]
    fn test_ensure_category_creates_once() {
        let mut menu = sample_menu();

        assert_eq!(menu.ensure_category("sides", Some("Ignored")), 1);
        let created = menu.ensure_category("drinks", None);
        assert_eq!(created, 2);
        assert_eq!(menu.categories[2].name, "drinks");
        assert_eq!(menu.ensure_category("drinks", Some("Drinks")), 2);
    }

    #[test]
    fn test_search_groups_by_category() {
        let menu = sample_menu();

        let results = menu.search("SUB");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category_id, "subs");
        assert_eq!(results[0].items.len(), 2);

        let results = menu.search("crisp");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category_name, "Sides");

        assert!(menu.search("pizza").is_empty());
    }

    #[test]
    fn test_check_unique_ids() {
        let mut menu = sample_menu();
        assert!(menu.check_unique_ids().is_ok());

        let duplicate = menu.categories[0].items[0].clone();
        menu.categories[1].items.push(duplicate);
        assert!(matches!(menu.check_unique_ids(), Err(AppError::Validation(_))));

        let mut menu = sample_menu();
        menu.categories[1].id = "subs".into();
        assert!(matches!(menu.check_unique_ids(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_link_categories_fills_back_references() {
        let mut menu = sample_menu();
        menu.categories[1].items[0].category_id = "custom".into();
        menu.link_categories();

        assert_eq!(menu.categories[0].items[0].category_id, "subs");
        assert_eq!(menu.categories[1].items[0].category_id, "custom");
    }
}
