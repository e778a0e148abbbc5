use chrono::Utc;
use tracing::info;

use crate::catalog::{
    normalize_price_variants, normalize_tags, parse_price, slugify, ItemIndex,
};
use crate::db::Database;
use crate::error::AppError;
use crate::models::{
    Category, CreateMenuItem, CreatedMenuItem, DeletedMenuItem, ItemAvailability, Menu, MenuItem,
    SearchGroup, UpdateMenuItem,
};

pub fn get_menu(db: &Database) -> Result<Menu, AppError> {
    db.find_menu()?
        .ok_or_else(|| AppError::not_found("Menu not found"))
}

pub fn get_category_items(db: &Database, category_id: &str) -> Result<Category, AppError> {
    let menu = get_menu(db)?;

    menu.category(category_id)
        .cloned()
        .ok_or_else(|| AppError::not_found("Category not found"))
}

pub fn search_menu(db: &Database, query: Option<&str>) -> Result<Vec<SearchGroup>, AppError> {
    let query = query
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::validation("Search query is required"))?;

    Ok(get_menu(db)?.search(query))
}

pub fn add_menu_item(db: &Database, payload: CreateMenuItem) -> Result<CreatedMenuItem, AppError> {
    let name = payload
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| AppError::validation("Item name and price are required"))?;
    let price = match payload.price.as_ref().filter(|p| !p.is_null()) {
        Some(price) => parse_price(price)?,
        None => return Err(AppError::validation("Item name and price are required")),
    };

    let created = db.update_menu(|menu| {
        let category_id = payload
            .category_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| slugify(payload.category_name.as_deref().unwrap_or_default()));
        if category_id.is_empty() {
            return Err(AppError::validation("Category is required"));
        }

        let item_id = payload
            .item_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("{}-{}", slugify(&name), Utc::now().timestamp_millis()));

        if ItemIndex::build(menu).contains(&item_id) {
            return Err(AppError::validation(
                "Item id already exists. Provide a unique itemId.",
            ));
        }

        let item = MenuItem {
            id: item_id,
            name,
            description: payload.description.unwrap_or_default(),
            price,
            image: payload.image.unwrap_or_default(),
            options: Vec::new(),
            price_variants: payload
                .price_variants
                .as_ref()
                .map(normalize_price_variants)
                .unwrap_or_default(),
            tags: payload.tags.as_ref().map(normalize_tags).unwrap_or_default(),
            available: payload.available != Some(false),
            category_id: category_id.clone(),
        };

        let position = menu.ensure_category(&category_id, payload.category_name.as_deref());
        menu.categories[position].items.push(item.clone());

        Ok(CreatedMenuItem { category_id, item })
    })?;

    info!(
        "Added menu item {} to category {}",
        created.item.id, created.category_id
    );

    Ok(created)
}

pub fn update_menu_item(
    db: &Database,
    item_id: &str,
    changes: UpdateMenuItem,
) -> Result<MenuItem, AppError> {
    db.update_menu(|menu| {
        let index = ItemIndex::build(menu);
        let item = menu
            .item_mut(&index, item_id)
            .ok_or_else(|| AppError::not_found("Item not found"))?;

        // validate before touching anything so a bad price leaves the item as is
        let price = changes
            .price
            .as_ref()
            .filter(|p| !p.is_null())
            .map(parse_price)
            .transpose()?;

        if let Some(name) = changes.name {
            item.name = name;
        }
        if let Some(description) = changes.description {
            item.description = description;
        }
        if let Some(price) = price {
            item.price = price;
        }
        if let Some(image) = changes.image {
            item.image = image;
        }
        if let Some(tags) = changes.tags.as_ref() {
            item.tags = normalize_tags(tags);
        }
        if let Some(available) = changes.available {
            item.available = available;
        }
        if let Some(variants) = changes.price_variants.as_ref() {
            item.price_variants = normalize_price_variants(variants);
        }

        Ok(item.clone())
    })
}

pub fn delete_menu_item(db: &Database, item_id: &str) -> Result<DeletedMenuItem, AppError> {
    db.update_menu(|menu| {
        let index = ItemIndex::build(menu);
        menu.remove_item(&index, item_id)
            .ok_or_else(|| AppError::not_found("Item not found"))?;

        Ok(DeletedMenuItem {
            item_id: item_id.to_string(),
        })
    })
}

pub fn update_item_availability(
    db: &Database,
    item_id: &str,
    available: Option<bool>,
) -> Result<ItemAvailability, AppError> {
    let available =
        available.ok_or_else(|| AppError::validation("available must be true or false"))?;

    db.update_menu(|menu| {
        let index = ItemIndex::build(menu);
        let item = menu
            .item_mut(&index, item_id)
            .ok_or_else(|| AppError::not_found("Item not found"))?;
        item.available = available;

        Ok(ItemAvailability {
            item_id: item_id.to_string(),
            available,
        })
    })
}

/// Replaces the whole menu. Meant for first-time setup.
pub fn seed_menu(db: &Database, mut menu: Menu) -> Result<Menu, AppError> {
    menu.link_categories();
    db.replace_menu(&menu)?;

    info!(
        "Menu seeded with {} categories and {} items",
        menu.categories.len(),
        ItemIndex::build(&menu).len()
    );

    Ok(menu)
}
