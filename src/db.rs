use std::path::Path;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::AppError;
use crate::models::{Menu, Order, OrderStatus, PaymentStatus};

const ORDER_COLUMNS: &str = "id, order_number, customer_name, customer_phone, customer_email, items,
     subtotal, tax, total, pickup_time, status, notes, payment_status, created_at, updated_at";

pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Unexpected(format!("Failed to create data directory: {e}")))?;
        }

        let conn = if path.as_os_str() == ":memory:" {
            Connection::open_in_memory()?
        } else {
            Connection::open(path)?
        };

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        Ok(Database {
            conn: Mutex::new(Connection::open_in_memory()?),
        })
    }

    pub fn initialize(&self) -> Result<(), AppError> {
        let conn = self.conn.lock()?;

        conn.execute_batch(
            "
            -- The store-wide menu, kept as one JSON document
            CREATE TABLE IF NOT EXISTS menus (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                document TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Pickup orders
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_number TEXT NOT NULL UNIQUE,
                customer_name TEXT NOT NULL,
                customer_phone TEXT NOT NULL,
                customer_email TEXT,
                items TEXT NOT NULL,
                subtotal REAL NOT NULL,
                tax REAL NOT NULL DEFAULT 0,
                total REAL NOT NULL,
                pickup_time TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending',
                notes TEXT,
                payment_status TEXT NOT NULL DEFAULT 'unpaid',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
            ",
        )?;

        Self::migrate_conn(&conn)?;

        Ok(())
    }

    /// Upgrades databases created before orders carried a payment status.
    fn migrate_conn(conn: &Connection) -> Result<(), AppError> {
        let columns: Vec<String> = conn
            .prepare("PRAGMA table_info(orders)")?
            .query_map([], |row| row.get::<_, String>(1))?
            .filter_map(|r| r.ok())
            .collect();

        if !columns.contains(&"payment_status".to_string()) {
            conn.execute(
                "ALTER TABLE orders ADD COLUMN payment_status TEXT NOT NULL DEFAULT 'unpaid'",
                [],
            )?;
        }

        Ok(())
    }

    // ===== MENU =====

    pub fn find_menu(&self) -> Result<Option<Menu>, AppError> {
        let conn = self.conn.lock()?;
        load_menu(&conn)
    }

    /// Loads the menu, applies `change` and writes the document back while
    /// holding the connection lock. Nothing is written if `change` fails or
    /// the result is not a valid menu.
    pub fn update_menu<T, F>(&self, change: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Menu) -> Result<T, AppError>,
    {
        let conn = self.conn.lock()?;
        let mut menu = load_menu(&conn)?.ok_or_else(|| AppError::not_found("Menu not found"))?;

        let result = change(&mut menu)?;
        menu.validate()?;
        menu.check_unique_ids()?;

        conn.execute(
            "UPDATE menus SET document = ?1, updated_at = ?2 WHERE id = 1",
            params![serde_json::to_string(&menu)?, timestamp()],
        )?;

        Ok(result)
    }

    /// Drops whatever menu exists and stores `menu` in its place.
    pub fn replace_menu(&self, menu: &Menu) -> Result<(), AppError> {
        menu.validate()?;
        menu.check_unique_ids()?;
        let document = serde_json::to_string(menu)?;

        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        let now = timestamp();

        tx.execute("DELETE FROM menus", [])?;
        tx.execute(
            "INSERT INTO menus (id, document, created_at, updated_at) VALUES (1, ?1, ?2, ?2)",
            params![document, now],
        )?;
        tx.commit()?;

        Ok(())
    }

    // ===== ORDERS =====

    /// Stores a new order and returns it with its assigned id and timestamps.
    pub fn insert_order(&self, order: &Order) -> Result<Order, AppError> {
        let conn = self.conn.lock()?;
        let now = timestamp();

        conn.execute(
            "INSERT INTO orders (order_number, customer_name, customer_phone, customer_email, items,
                                 subtotal, tax, total, pickup_time, status, notes, payment_status,
                                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
            params![
                order.order_number,
                order.customer_name,
                order.customer_phone,
                order.customer_email,
                serde_json::to_string(&order.items)?,
                order.subtotal,
                order.tax,
                order.total,
                order.pickup_time,
                order.status.as_str(),
                order.notes,
                order.payment_status.as_str(),
                now,
            ],
        )?;

        let id = conn.last_insert_rowid();
        find_order_conn(&conn, id)?
            .ok_or_else(|| AppError::Unexpected(format!("Order {id} vanished after insert")))
    }

    pub fn list_orders(&self, status: Option<&str>) -> Result<Vec<Order>, AppError> {
        let conn = self.conn.lock()?;

        let orders = match status {
            Some(status) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1
                     ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map([status], order_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC, id DESC"
                ))?;
                let rows = stmt.query_map([], order_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(orders)
    }

    pub fn find_order(&self, id: i64) -> Result<Option<Order>, AppError> {
        let conn = self.conn.lock()?;
        find_order_conn(&conn, id)
    }

    /// Returns `None` when no order has this id.
    pub fn set_order_status(&self, id: i64, status: OrderStatus) -> Result<Option<Order>, AppError> {
        let conn = self.conn.lock()?;

        conn.execute(
            "UPDATE orders SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), timestamp(), id],
        )?;

        if conn.changes() == 0 {
            return Ok(None);
        }

        find_order_conn(&conn, id)
    }

    /// Returns `None` when no order has this id.
    pub fn set_payment_status(
        &self,
        id: i64,
        payment_status: PaymentStatus,
    ) -> Result<Option<Order>, AppError> {
        let conn = self.conn.lock()?;

        conn.execute(
            "UPDATE orders SET payment_status = ?1, updated_at = ?2 WHERE id = ?3",
            params![payment_status.as_str(), timestamp(), id],
        )?;

        if conn.changes() == 0 {
            return Ok(None);
        }

        find_order_conn(&conn, id)
    }
}

fn load_menu(conn: &Connection) -> Result<Option<Menu>, AppError> {
    let document: Option<String> = conn
        .query_row("SELECT document FROM menus WHERE id = 1", [], |row| row.get(0))
        .optional()?;

    document
        .map(|d| serde_json::from_str(&d).map_err(AppError::from))
        .transpose()
}

fn find_order_conn(conn: &Connection, id: i64) -> Result<Option<Order>, AppError> {
    let order = conn
        .query_row(
            &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
            [id],
            order_from_row,
        )
        .optional()?;

    Ok(order)
}

fn conversion_error(column: usize, e: impl std::error::Error + Send + Sync + 'static) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}

fn parse_column<T>(row: &Row, column: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(column)?;
    raw.parse().map_err(|e: String| {
        conversion_error(column, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    })
}

fn order_from_row(row: &Row) -> rusqlite::Result<Order> {
    let items: String = row.get(5)?;

    Ok(Order {
        id: row.get(0)?,
        order_number: row.get(1)?,
        customer_name: row.get(2)?,
        customer_phone: row.get(3)?,
        customer_email: row.get(4)?,
        items: serde_json::from_str(&items).map_err(|e| conversion_error(5, e))?,
        subtotal: row.get(6)?,
        tax: row.get(7)?,
        total: row.get(8)?,
        pickup_time: row.get(9)?,
        status: parse_column(row, 10)?,
        notes: row.get(11)?,
        payment_status: parse_column(row, 12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}
