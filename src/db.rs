//! Formula store schema and operations

use rusqlite::{Connection, OptionalExtension, Result};

use crate::models::{Formula, MaterialId, MaterialQuantity};

/// Initialize the store schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Every material named by any formula
        CREATE TABLE IF NOT EXISTS materials (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        );

        -- seq preserves the order formulas were loaded in
        CREATE TABLE IF NOT EXISTS formulas (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            output_id INTEGER NOT NULL,
            output_quantity REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS formula_inputs (
            formula_id INTEGER NOT NULL,
            position INTEGER NOT NULL,
            material_id INTEGER NOT NULL,
            quantity REAL NOT NULL,
            PRIMARY KEY (formula_id, position)
        );

        CREATE INDEX IF NOT EXISTS idx_formulas_output ON formulas(output_id);
        "#,
    )?;
    Ok(())
}

/// Insert a material. Fails on an existing id or name.
pub fn insert_material(conn: &Connection, id: MaterialId, name: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO materials (id, name) VALUES (?1, ?2)",
        (id.0, name),
    )?;
    Ok(())
}

/// Insert a formula and its inputs. Materials must already exist, and a
/// formula id already present is a constraint error.
pub fn insert_formula(conn: &Connection, formula: &Formula) -> Result<()> {
    conn.execute(
        "INSERT INTO formulas (id, name, output_id, output_quantity)
         VALUES (?1, ?2, ?3, ?4)",
        (
            formula.id,
            &formula.name,
            formula.output.material.0,
            formula.output.quantity,
        ),
    )?;

    for (position, input) in formula.inputs.iter().enumerate() {
        conn.execute(
            "INSERT INTO formula_inputs (formula_id, position, material_id, quantity)
             VALUES (?1, ?2, ?3, ?4)",
            (formula.id, position as i64, input.material.0, input.quantity),
        )?;
    }
    Ok(())
}

/// Get all formulas that produce a given material, in load order
pub fn get_producers(conn: &Connection, material: MaterialId) -> Result<Vec<Formula>> {
    let mut stmt = conn.prepare_cached(
        "SELECT f.id, f.name, f.output_id, m.name, f.output_quantity
         FROM formulas f
         JOIN materials m ON m.id = f.output_id
         WHERE f.output_id = ?1
         ORDER BY f.seq",
    )?;
    let heads = stmt
        .query_map([material.0], formula_head)?
        .collect::<Result<Vec<_>>>()?;
    attach_inputs(conn, heads)
}

/// List every formula in load order
pub fn list_formulas(conn: &Connection) -> Result<Vec<Formula>> {
    let mut stmt = conn.prepare_cached(
        "SELECT f.id, f.name, f.output_id, m.name, f.output_quantity
         FROM formulas f
         JOIN materials m ON m.id = f.output_id
         ORDER BY f.seq",
    )?;
    let heads = stmt
        .query_map([], formula_head)?
        .collect::<Result<Vec<_>>>()?;
    attach_inputs(conn, heads)
}

/// Get a single formula by id
pub fn get_formula(conn: &Connection, formula_id: u32) -> Result<Option<Formula>> {
    let head = conn
        .query_row(
            "SELECT f.id, f.name, f.output_id, m.name, f.output_quantity
             FROM formulas f
             JOIN materials m ON m.id = f.output_id
             WHERE f.id = ?1",
            [formula_id],
            formula_head,
        )
        .optional()?;

    match head {
        Some(head) => Ok(attach_inputs(conn, vec![head])?.pop()),
        None => Ok(None),
    }
}

/// Get the inputs of a formula in recipe order
pub fn get_formula_inputs(conn: &Connection, formula_id: u32) -> Result<Vec<MaterialQuantity>> {
    let mut stmt = conn.prepare_cached(
        "SELECT fi.material_id, m.name, fi.quantity
         FROM formula_inputs fi
         JOIN materials m ON m.id = fi.material_id
         WHERE fi.formula_id = ?1
         ORDER BY fi.position",
    )?;

    let rows = stmt.query_map([formula_id], |row| {
        Ok(MaterialQuantity {
            material: MaterialId(row.get(0)?),
            name: row.get(1)?,
            quantity: row.get(2)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn material_id(conn: &Connection, name: &str) -> Result<Option<MaterialId>> {
    conn.query_row("SELECT id FROM materials WHERE name = ?1", [name], |row| {
        Ok(MaterialId(row.get(0)?))
    })
    .optional()
}

pub fn material_name(conn: &Connection, material: MaterialId) -> Result<Option<String>> {
    conn.prepare_cached("SELECT name FROM materials WHERE id = ?1")?
        .query_row([material.0], |row| row.get(0))
        .optional()
}

/// List all material names, sorted
pub fn list_material_names(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM materials ORDER BY name")?;
    let rows = stmt.query_map([], |row| row.get(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

fn formula_head(row: &rusqlite::Row<'_>) -> Result<Formula> {
    Ok(Formula {
        id: row.get(0)?,
        name: row.get(1)?,
        output: MaterialQuantity {
            material: MaterialId(row.get(2)?),
            name: row.get(3)?,
            quantity: row.get(4)?,
        },
        inputs: Vec::new(),
    })
}

fn attach_inputs(conn: &Connection, mut formulas: Vec<Formula>) -> Result<Vec<Formula>> {
    for formula in &mut formulas {
        formula.inputs = get_formula_inputs(conn, formula.id)?;
    }
    Ok(formulas)
}
