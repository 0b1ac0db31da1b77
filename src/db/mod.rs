mod schema;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Params, Row};

use crate::error::{PersistenceError, ValidationError};
use crate::ids::EntityKind;
use crate::models::*;
use crate::store::{CascadeReport, Relations, Store, StoreResult};

/// SQLite implementation of the persistence collaborator.
///
/// Cloning is cheap; clones share one connection.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("", "", "relief-tracker")
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
        Ok(dirs.data_dir().join("relief.db"))
    }

    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates the schema if it is missing.
    pub fn migrate(&self) -> Result<()> {
        let mut conn = self.lock()?;
        schema::create_schema(&mut conn)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| PersistenceError::Unavailable("database lock poisoned".to_string()))
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
        }
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseBusy
                        | rusqlite::ErrorCode::DatabaseLocked
                        | rusqlite::ErrorCode::CannotOpen
                ) =>
            {
                PersistenceError::Unavailable(msg.unwrap_or_else(|| code.to_string()))
            }
            other => PersistenceError::Failed(other.to_string()),
        }
    }
}

fn corrupt(kind: EntityKind, id: i64) -> impl Fn(ValidationError) -> PersistenceError {
    move |e| PersistenceError::Corrupt {
        kind,
        id,
        reason: e.to_string(),
    }
}

// ============================================================
// Supplies
// ============================================================

const SUPPLY_COLUMNS: &str =
    "s.id, s.name, s.kind, s.item_type, s.room_location, s.grid_location, s.description, s.allocation_date";

struct SupplyRow {
    id: i64,
    name: String,
    kind: String,
    item_type: String,
    room_location: Option<String>,
    grid_location: Option<String>,
    description: Option<String>,
    allocation_date: Option<String>,
}

impl SupplyRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            kind: row.get(2)?,
            item_type: row.get(3)?,
            room_location: row.get(4)?,
            grid_location: row.get(5)?,
            description: row.get(6)?,
            allocation_date: row.get(7)?,
        })
    }

    fn into_supply(self) -> StoreResult<Supply> {
        let corrupt = corrupt(EntityKind::Supply, self.id);
        let item = match self.item_type.as_str() {
            "generic" => SupplyItem::Generic,
            "blanket" => SupplyItem::Blanket,
            "cot" => SupplyItem::Cot {
                room_location: self.room_location.unwrap_or_default(),
                grid_location: self.grid_location.unwrap_or_default(),
            },
            "personal_belonging" => SupplyItem::PersonalBelonging {
                description: self.description.unwrap_or_default(),
            },
            "water" => SupplyItem::Water {
                allocation_date: self
                    .allocation_date
                    .as_deref()
                    .map(Date::parse)
                    .transpose()
                    .map_err(&corrupt)?,
            },
            other => {
                return Err(PersistenceError::Corrupt {
                    kind: EntityKind::Supply,
                    id: self.id,
                    reason: format!("unknown supply type '{}'", other),
                })
            }
        };
        Supply::restore(self.id, &self.name, &self.kind, item).map_err(corrupt)
    }
}

/// Column values for the kind-specific part of a supply.
fn supply_payload(
    supply: &Supply,
) -> (
    Option<&str>,
    Option<&str>,
    Option<&str>,
    Option<String>,
) {
    (
        supply.room_location(),
        supply.grid_location(),
        supply.description(),
        supply.allocation_date().map(|d| d.to_string()),
    )
}

fn query_supplies<P: Params>(conn: &Connection, sql: &str, params: P) -> StoreResult<Vec<Supply>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, SupplyRow::read)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(SupplyRow::into_supply).collect()
}

fn insert_supply(conn: &Connection, supply: &Supply) -> StoreResult<()> {
    let (room, grid, description, allocation_date) = supply_payload(supply);
    conn.execute(
        "INSERT INTO supplies (id, name, kind, item_type, room_location, grid_location, description, allocation_date)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        (
            supply.id(),
            supply.name(),
            supply.kind(),
            supply.item().as_str(),
            room,
            grid,
            description,
            allocation_date,
        ),
    )?;
    Ok(())
}

/// Adds the catalog row for a held supply that the catalog lacks. Existing
/// rows are left alone; only supply writes change catalog columns.
fn ensure_supply(conn: &Connection, supply: &Supply) -> StoreResult<()> {
    let (room, grid, description, allocation_date) = supply_payload(supply);
    conn.execute(
        "INSERT INTO supplies (id, name, kind, item_type, room_location, grid_location, description, allocation_date)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO NOTHING",
        (
            supply.id(),
            supply.name(),
            supply.kind(),
            supply.item().as_str(),
            room,
            grid,
            description,
            allocation_date,
        ),
    )?;
    Ok(())
}

#[derive(Clone, Copy)]
enum Holder {
    Person(i64),
    Location(i64),
}

/// Replaces the allocation rows of one holder with `items`, in order.
///
/// A supply has one holder at a time, so any other allocation of the same
/// supply is dropped.
fn replace_allocations(conn: &Connection, holder: Holder, items: &[Supply]) -> StoreResult<()> {
    let (person_id, location_id) = match holder {
        Holder::Person(id) => {
            conn.execute("DELETE FROM supply_allocations WHERE person_id = ?", [id])?;
            (Some(id), None)
        }
        Holder::Location(id) => {
            conn.execute("DELETE FROM supply_allocations WHERE location_id = ?", [id])?;
            (None, Some(id))
        }
    };

    for (position, supply) in items.iter().enumerate() {
        ensure_supply(conn, supply)?;
        conn.execute(
            "DELETE FROM supply_allocations WHERE supply_id = ?",
            [supply.id()],
        )?;
        conn.execute(
            "INSERT INTO supply_allocations (supply_id, person_id, location_id, position)
             VALUES (?, ?, ?, ?)",
            (supply.id(), person_id, location_id, position as i64),
        )?;
    }
    Ok(())
}

fn supplies_for_person(conn: &Connection, person_id: i64) -> StoreResult<Vec<Supply>> {
    query_supplies(
        conn,
        &format!(
            "SELECT {SUPPLY_COLUMNS} FROM supply_allocations a
             JOIN supplies s ON s.id = a.supply_id
             WHERE a.person_id = ? ORDER BY a.position"
        ),
        [person_id],
    )
}

fn supplies_for_location(conn: &Connection, location_id: i64) -> StoreResult<Vec<Supply>> {
    query_supplies(
        conn,
        &format!(
            "SELECT {SUPPLY_COLUMNS} FROM supply_allocations a
             JOIN supplies s ON s.id = a.supply_id
             WHERE a.location_id = ? ORDER BY a.position"
        ),
        [location_id],
    )
}

impl Store<Supply> for Database {
    fn create(&self, supply: &Supply) -> StoreResult<()> {
        let conn = self.lock()?;
        insert_supply(&conn, supply)
    }

    fn read_all(&self) -> StoreResult<Vec<Supply>> {
        let conn = self.lock()?;
        query_supplies(
            &conn,
            &format!("SELECT {SUPPLY_COLUMNS} FROM supplies s ORDER BY s.id"),
            [],
        )
    }

    fn read_by_id(&self, id: i64) -> StoreResult<Option<Supply>> {
        let conn = self.lock()?;
        let mut found = query_supplies(
            &conn,
            &format!("SELECT {SUPPLY_COLUMNS} FROM supplies s WHERE s.id = ?"),
            [id],
        )?;
        Ok(found.pop())
    }

    fn update(&self, supply: &Supply) -> StoreResult<bool> {
        let conn = self.lock()?;
        let (room, grid, description, allocation_date) = supply_payload(supply);
        let rows = conn.execute(
            "UPDATE supplies SET name = ?, kind = ?, item_type = ?, room_location = ?, grid_location = ?,
                description = ?, allocation_date = ?
             WHERE id = ?",
            (
                supply.name(),
                supply.kind(),
                supply.item().as_str(),
                room,
                grid,
                description,
                allocation_date,
                supply.id(),
            ),
        )?;
        Ok(rows > 0)
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM supply_allocations WHERE supply_id = ?", [id])?;
        let rows = tx.execute("DELETE FROM supplies WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(rows > 0)
    }
}

// ============================================================
// People
// ============================================================

const PERSON_COLUMNS: &str = "id, first_name, last_name, date_of_birth, gender, comments, phone_number, family_group_id, is_victim";

struct PersonRow {
    id: i64,
    first_name: String,
    last_name: String,
    date_of_birth: Option<String>,
    gender: Option<String>,
    comments: Option<String>,
    phone_number: Option<String>,
    family_group_id: Option<i64>,
    is_victim: bool,
}

impl PersonRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            first_name: row.get(1)?,
            last_name: row.get(2)?,
            date_of_birth: row.get(3)?,
            gender: row.get(4)?,
            comments: row.get(5)?,
            phone_number: row.get(6)?,
            family_group_id: row.get(7)?,
            is_victim: row.get::<_, i32>(8)? != 0,
        })
    }

    /// Builds the person, pulling medical records and, for victims, the
    /// personal inventory from their own tables.
    fn into_record(self, conn: &Connection) -> StoreResult<PersonRecord> {
        let corrupt = corrupt(EntityKind::Person, self.id);
        let mut person =
            Person::restore(self.id, &self.first_name, &self.last_name).map_err(&corrupt)?;
        if let Some(date) = &self.date_of_birth {
            person.set_date_of_birth(date).map_err(&corrupt)?;
        }
        if let Some(gender) = &self.gender {
            person.set_gender(gender).map_err(&corrupt)?;
        }
        if let Some(comments) = &self.comments {
            person.set_comments(comments).map_err(&corrupt)?;
        }
        if let Some(phone) = &self.phone_number {
            person.try_set_phone_number(phone).map_err(&corrupt)?;
        }
        if let Some(group) = self.family_group_id {
            person.try_set_family_group(group);
        }

        let mut stmt =
            conn.prepare("SELECT id FROM medical_records WHERE person_id = ? ORDER BY id")?;
        let record_ids = stmt
            .query_map([self.id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        for id in record_ids {
            person.add_medical_record(id);
        }

        if !self.is_victim {
            return Ok(PersonRecord::Person(person));
        }
        let mut victim = DisasterVictim::from_person(person);
        for supply in supplies_for_person(conn, self.id)? {
            victim.add_item(supply);
        }
        Ok(PersonRecord::Victim(victim))
    }
}

fn query_people<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<PersonRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, PersonRow::read)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(|row| row.into_record(conn)).collect()
}

impl Store<PersonRecord> for Database {
    fn create(&self, record: &PersonRecord) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let person = record.person();
        tx.execute(
            "INSERT INTO people (id, first_name, last_name, date_of_birth, gender, comments, phone_number, family_group_id, is_victim)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            (
                person.id(),
                person.first_name(),
                person.last_name(),
                person.date_of_birth().map(|d| d.to_string()),
                person.gender(),
                person.comments(),
                person.phone_number(),
                person.family_group(),
                if record.is_victim() { 1 } else { 0 },
            ),
        )?;
        if let Some(victim) = record.as_victim() {
            replace_allocations(&tx, Holder::Person(person.id()), victim.personal_inventory())?;
        }
        tx.commit()?;
        Ok(())
    }

    fn read_all(&self) -> StoreResult<Vec<PersonRecord>> {
        let conn = self.lock()?;
        query_people(
            &conn,
            &format!("SELECT {PERSON_COLUMNS} FROM people ORDER BY id"),
            [],
        )
    }

    fn read_by_id(&self, id: i64) -> StoreResult<Option<PersonRecord>> {
        let conn = self.lock()?;
        let mut found = query_people(
            &conn,
            &format!("SELECT {PERSON_COLUMNS} FROM people WHERE id = ?"),
            [id],
        )?;
        Ok(found.pop())
    }

    fn update(&self, record: &PersonRecord) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let person = record.person();
        let rows = tx.execute(
            "UPDATE people SET first_name = ?, last_name = ?, date_of_birth = ?, gender = ?, comments = ?,
                phone_number = ?, family_group_id = ?, is_victim = ?
             WHERE id = ?",
            (
                person.first_name(),
                person.last_name(),
                person.date_of_birth().map(|d| d.to_string()),
                person.gender(),
                person.comments(),
                person.phone_number(),
                person.family_group(),
                if record.is_victim() { 1 } else { 0 },
                person.id(),
            ),
        )?;
        if rows == 0 {
            return Ok(false);
        }
        let inventory = record
            .as_victim()
            .map(|v| v.personal_inventory())
            .unwrap_or_default();
        replace_allocations(&tx, Holder::Person(person.id()), inventory)?;
        tx.commit()?;
        Ok(true)
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM people WHERE id = ?", [id])?;
        Ok(rows > 0)
    }
}

// ============================================================
// Family groups
// ============================================================

fn family_members(conn: &Connection, group_id: i64) -> StoreResult<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT person_id FROM family_members WHERE family_group_id = ? ORDER BY position",
    )?;
    let members = stmt
        .query_map([group_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(members)
}

fn replace_family_members(conn: &Connection, group: &FamilyGroup) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM family_members WHERE family_group_id = ?",
        [group.id()],
    )?;
    for (position, person_id) in group.members().iter().enumerate() {
        conn.execute(
            "INSERT INTO family_members (family_group_id, person_id, position) VALUES (?, ?, ?)",
            (group.id(), person_id, position as i64),
        )?;
    }
    Ok(())
}

fn query_family_groups<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<FamilyGroup>> {
    let mut stmt = conn.prepare(sql)?;
    let ids = stmt
        .query_map(params, |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    ids.into_iter()
        .map(|id| -> StoreResult<FamilyGroup> {
            Ok(FamilyGroup::restore(id, family_members(conn, id)?))
        })
        .collect()
}

impl Store<FamilyGroup> for Database {
    fn create(&self, group: &FamilyGroup) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("INSERT INTO family_groups (id) VALUES (?)", [group.id()])?;
        replace_family_members(&tx, group)?;
        tx.commit()?;
        Ok(())
    }

    fn read_all(&self) -> StoreResult<Vec<FamilyGroup>> {
        let conn = self.lock()?;
        query_family_groups(&conn, "SELECT id FROM family_groups ORDER BY id", [])
    }

    fn read_by_id(&self, id: i64) -> StoreResult<Option<FamilyGroup>> {
        let conn = self.lock()?;
        let mut found =
            query_family_groups(&conn, "SELECT id FROM family_groups WHERE id = ?", [id])?;
        Ok(found.pop())
    }

    fn update(&self, group: &FamilyGroup) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let exists = tx
            .query_row(
                "SELECT 1 FROM family_groups WHERE id = ?",
                [group.id()],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if !exists {
            return Ok(false);
        }
        replace_family_members(&tx, group)?;
        tx.commit()?;
        Ok(true)
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM family_members WHERE family_group_id = ?", [id])?;
        tx.execute(
            "UPDATE people SET family_group_id = NULL WHERE family_group_id = ?",
            [id],
        )?;
        let rows = tx.execute("DELETE FROM family_groups WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(rows > 0)
    }
}

// ============================================================
// Locations
// ============================================================

fn occupants_at(conn: &Connection, location_id: i64) -> StoreResult<Vec<i64>> {
    let mut stmt = conn.prepare(
        "SELECT person_id FROM location_occupants WHERE location_id = ? ORDER BY position",
    )?;
    let occupants = stmt
        .query_map([location_id], |row| row.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(occupants)
}

fn replace_occupants(conn: &Connection, location: &Location) -> StoreResult<()> {
    conn.execute(
        "DELETE FROM location_occupants WHERE location_id = ?",
        [location.id()],
    )?;
    for (position, person_id) in location.occupants().iter().enumerate() {
        conn.execute(
            "INSERT INTO location_occupants (location_id, person_id, position) VALUES (?, ?, ?)",
            (location.id(), person_id, position as i64),
        )?;
    }
    Ok(())
}

fn query_locations<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<Location>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, name, address)| -> StoreResult<Location> {
            Location::restore(
                id,
                &name,
                &address,
                occupants_at(conn, id)?,
                supplies_for_location(conn, id)?,
            )
            .map_err(corrupt(EntityKind::Location, id))
        })
        .collect()
}

impl Store<Location> for Database {
    fn create(&self, location: &Location) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO locations (id, name, address) VALUES (?, ?, ?)",
            (location.id(), location.name(), location.address()),
        )?;
        replace_occupants(&tx, location)?;
        replace_allocations(&tx, Holder::Location(location.id()), location.inventory())?;
        tx.commit()?;
        Ok(())
    }

    fn read_all(&self) -> StoreResult<Vec<Location>> {
        let conn = self.lock()?;
        query_locations(&conn, "SELECT id, name, address FROM locations ORDER BY id", [])
    }

    fn read_by_id(&self, id: i64) -> StoreResult<Option<Location>> {
        let conn = self.lock()?;
        let mut found = query_locations(
            &conn,
            "SELECT id, name, address FROM locations WHERE id = ?",
            [id],
        )?;
        Ok(found.pop())
    }

    fn update(&self, location: &Location) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let rows = tx.execute(
            "UPDATE locations SET name = ?, address = ? WHERE id = ?",
            (location.name(), location.address(), location.id()),
        )?;
        if rows == 0 {
            return Ok(false);
        }
        replace_occupants(&tx, location)?;
        replace_allocations(&tx, Holder::Location(location.id()), location.inventory())?;
        tx.commit()?;
        Ok(true)
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM location_occupants WHERE location_id = ?", [id])?;
        tx.execute("DELETE FROM supply_allocations WHERE location_id = ?", [id])?;
        let rows = tx.execute("DELETE FROM locations WHERE id = ?", [id])?;
        tx.commit()?;
        Ok(rows > 0)
    }
}

// ============================================================
// Medical records
// ============================================================

const MEDICAL_RECORD_COLUMNS: &str =
    "id, person_id, location_id, treatment_details, date_of_treatment";

fn query_medical_records<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<MedicalRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, person, location, details, date)| {
            MedicalRecord::restore(id, person, location, &details, &date)
                .map_err(corrupt(EntityKind::MedicalRecord, id))
        })
        .collect()
}

impl Store<MedicalRecord> for Database {
    fn create(&self, record: &MedicalRecord) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO medical_records (id, person_id, location_id, treatment_details, date_of_treatment)
             VALUES (?, ?, ?, ?, ?)",
            (
                record.id(),
                record.person(),
                record.location(),
                record.treatment_details(),
                record.date_of_treatment().to_string(),
            ),
        )?;
        Ok(())
    }

    fn read_all(&self) -> StoreResult<Vec<MedicalRecord>> {
        let conn = self.lock()?;
        query_medical_records(
            &conn,
            &format!("SELECT {MEDICAL_RECORD_COLUMNS} FROM medical_records ORDER BY id"),
            [],
        )
    }

    fn read_by_id(&self, id: i64) -> StoreResult<Option<MedicalRecord>> {
        let conn = self.lock()?;
        let mut found = query_medical_records(
            &conn,
            &format!("SELECT {MEDICAL_RECORD_COLUMNS} FROM medical_records WHERE id = ?"),
            [id],
        )?;
        Ok(found.pop())
    }

    fn update(&self, record: &MedicalRecord) -> StoreResult<bool> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE medical_records SET person_id = ?, location_id = ?, treatment_details = ?, date_of_treatment = ?
             WHERE id = ?",
            (
                record.person(),
                record.location(),
                record.treatment_details(),
                record.date_of_treatment().to_string(),
                record.id(),
            ),
        )?;
        Ok(rows > 0)
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM medical_records WHERE id = ?", [id])?;
        Ok(rows > 0)
    }
}

// ============================================================
// Inquiries
// ============================================================

const INQUIRY_COLUMNS: &str =
    "id, inquirer_id, missing_person_id, date_of_inquiry, info_provided, last_known_location_id";

fn query_inquiries<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> StoreResult<Vec<Inquiry>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(|(id, inquirer, missing, date, info, location)| {
            Inquiry::restore(id, inquirer, missing, &date, &info, location)
                .map_err(corrupt(EntityKind::Inquiry, id))
        })
        .collect()
}

impl Store<Inquiry> for Database {
    fn create(&self, inquiry: &Inquiry) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO inquiries (id, inquirer_id, missing_person_id, date_of_inquiry, info_provided, last_known_location_id)
             VALUES (?, ?, ?, ?, ?, ?)",
            (
                inquiry.id(),
                inquiry.inquirer(),
                inquiry.missing_person(),
                inquiry.date_of_inquiry().to_string(),
                inquiry.info_provided(),
                inquiry.last_known_location(),
            ),
        )?;
        Ok(())
    }

    fn read_all(&self) -> StoreResult<Vec<Inquiry>> {
        let conn = self.lock()?;
        query_inquiries(
            &conn,
            &format!("SELECT {INQUIRY_COLUMNS} FROM inquiries ORDER BY id"),
            [],
        )
    }

    fn read_by_id(&self, id: i64) -> StoreResult<Option<Inquiry>> {
        let conn = self.lock()?;
        let mut found = query_inquiries(
            &conn,
            &format!("SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE id = ?"),
            [id],
        )?;
        Ok(found.pop())
    }

    fn update(&self, inquiry: &Inquiry) -> StoreResult<bool> {
        let conn = self.lock()?;
        let rows = conn.execute(
            "UPDATE inquiries SET inquirer_id = ?, missing_person_id = ?, date_of_inquiry = ?, info_provided = ?,
                last_known_location_id = ?
             WHERE id = ?",
            (
                inquiry.inquirer(),
                inquiry.missing_person(),
                inquiry.date_of_inquiry().to_string(),
                inquiry.info_provided(),
                inquiry.last_known_location(),
                inquiry.id(),
            ),
        )?;
        Ok(rows > 0)
    }

    fn delete(&self, id: i64) -> StoreResult<bool> {
        let conn = self.lock()?;
        let rows = conn.execute("DELETE FROM inquiries WHERE id = ?", [id])?;
        Ok(rows > 0)
    }
}

// ============================================================
// Relationship queries
// ============================================================

impl Relations for Database {
    fn occupants_at(&self, location_id: i64) -> StoreResult<Vec<i64>> {
        let conn = self.lock()?;
        occupants_at(&conn, location_id)
    }

    fn supplies_for_person(&self, person_id: i64) -> StoreResult<Vec<Supply>> {
        let conn = self.lock()?;
        supplies_for_person(&conn, person_id)
    }

    fn supplies_for_location(&self, location_id: i64) -> StoreResult<Vec<Supply>> {
        let conn = self.lock()?;
        supplies_for_location(&conn, location_id)
    }

    fn medical_records_for_person(&self, person_id: i64) -> StoreResult<Vec<MedicalRecord>> {
        let conn = self.lock()?;
        query_medical_records(
            &conn,
            &format!(
                "SELECT {MEDICAL_RECORD_COLUMNS} FROM medical_records WHERE person_id = ? ORDER BY id"
            ),
            [person_id],
        )
    }

    fn medical_records_for_location(&self, location_id: i64) -> StoreResult<Vec<MedicalRecord>> {
        let conn = self.lock()?;
        query_medical_records(
            &conn,
            &format!(
                "SELECT {MEDICAL_RECORD_COLUMNS} FROM medical_records WHERE location_id = ? ORDER BY id"
            ),
            [location_id],
        )
    }

    fn inquiries_by_inquirer(&self, person_id: i64) -> StoreResult<Vec<Inquiry>> {
        let conn = self.lock()?;
        query_inquiries(
            &conn,
            &format!("SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE inquirer_id = ? ORDER BY id"),
            [person_id],
        )
    }

    fn inquiries_for_missing_person(&self, person_id: i64) -> StoreResult<Vec<Inquiry>> {
        let conn = self.lock()?;
        query_inquiries(
            &conn,
            &format!(
                "SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE missing_person_id = ? ORDER BY id"
            ),
            [person_id],
        )
    }

    fn inquiries_for_location(&self, location_id: i64) -> StoreResult<Vec<Inquiry>> {
        let conn = self.lock()?;
        query_inquiries(
            &conn,
            &format!(
                "SELECT {INQUIRY_COLUMNS} FROM inquiries WHERE last_known_location_id = ? ORDER BY id"
            ),
            [location_id],
        )
    }

    fn delete_person_cascade(&self, person_id: i64) -> StoreResult<CascadeReport> {
        let mut conn = self.lock()?;
        // Dropping the transaction without commit rolls every statement back.
        let tx = conn.transaction()?;

        let report = CascadeReport {
            medical_records: tx.execute(
                "DELETE FROM medical_records WHERE person_id = ?",
                [person_id],
            )?,
            location_memberships: tx.execute(
                "DELETE FROM location_occupants WHERE person_id = ?",
                [person_id],
            )?,
            supply_allocations: tx.execute(
                "DELETE FROM supply_allocations WHERE person_id = ?",
                [person_id],
            )?,
            family_memberships: tx.execute(
                "DELETE FROM family_members WHERE person_id = ?",
                [person_id],
            )?,
            inquiries: tx.execute(
                "DELETE FROM inquiries WHERE inquirer_id = ?1 OR missing_person_id = ?1",
                [person_id],
            )?,
        };
        tx.execute("DELETE FROM people WHERE id = ?", [person_id])?;
        tx.commit()?;

        tracing::info!(person_id, ?report, "Deleted person and dependent records");
        Ok(report)
    }
}
