use relief_tracker::controller::Controller;
use relief_tracker::db::Database;
use relief_tracker::error::{Error, ValidationError};
use relief_tracker::ids::{EntityKind, IdAllocator};
use relief_tracker::models::*;
use relief_tracker::store::{Relations, Store};
use speculate2::speculate;
use tempfile::TempDir;

fn empty_controller() -> Controller<Database> {
    let db = Database::open_memory().expect("Failed to create in-memory database");
    db.migrate().expect("Failed to run migrations");
    Controller::load(db, IdAllocator::new()).expect("Failed to load")
}

/// A controller on a database file, plus a second connection to the same
/// file for installing failure triggers.
fn file_controller() -> (TempDir, Controller<Database>, rusqlite::Connection) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("relief.db");
    let db = Database::open(path.clone()).expect("Failed to open database");
    db.migrate().expect("Failed to run migrations");
    let raw = rusqlite::Connection::open(&path).expect("Failed to open raw connection");
    let controller = Controller::load(db, IdAllocator::new()).expect("Failed to load");
    (dir, controller, raw)
}

fn fail_on(raw: &rusqlite::Connection, event: &str, table: &str) {
    raw.execute_batch(&format!(
        "CREATE TRIGGER fail_{event}_{table} BEFORE {event} ON {table}
         BEGIN SELECT RAISE(ABORT, 'simulated failure'); END;"
    ))
    .expect("Failed to install trigger");
}

fn add_victim(controller: &mut Controller<Database>, first: &str, last: &str) -> i64 {
    let victim = DisasterVictim::new(controller.ids(), first, last).unwrap();
    let id = victim.id();
    assert!(controller.add_person(victim).is_complete());
    id
}

fn add_person(controller: &mut Controller<Database>, first: &str, last: &str) -> i64 {
    let person = Person::new(controller.ids(), first, last).unwrap();
    let id = person.id();
    assert!(controller.add_person(person).is_complete());
    id
}

fn add_shelter(controller: &mut Controller<Database>) -> i64 {
    let location = Location::new(controller.ids(), "Riverside Shelter", "40 Bow Trail SW").unwrap();
    let id = location.id();
    assert!(controller.add_location(location).is_complete());
    id
}

fn date(s: &str) -> Date {
    Date::parse(s).unwrap()
}

speculate! {
    describe "collections" {
        before {
            let mut controller = empty_controller();
        }

        it "hands out copies" {
            add_victim(&mut controller, "Emily", "Fall");

            let mut people = controller.people();
            people[0].person_mut().set_first_name("Changed").unwrap();
            people.clear();

            let stored = controller.people();
            assert_eq!(stored.len(), 1);
            assert_eq!(stored[0].person().first_name(), "Emily");
        }

        it "issues the first ids from each seed" {
            let person = add_person(&mut controller, "Jay", "Luck");
            let location = add_shelter(&mut controller);
            assert_eq!(person, 10);
            assert_eq!(location, 100);
        }

        it "ignores updates of unknown entities" {
            let stranger = Location::new(controller.ids(), "Nowhere", "0 Main St").unwrap();
            let outcome = controller.update_location(stranger);
            assert!(!outcome.local_applied);
            assert!(!outcome.persisted);
            assert!(outcome.failure.is_none());
        }
    }

    describe "families" {
        before {
            let mut controller = empty_controller();
            let jay = add_person(&mut controller, "Jay", "Luck");
            let emily = add_person(&mut controller, "Emily", "Fall");
        }

        it "keeps members in order and removes one" {
            let (group, outcome) = controller.form_family(&[jay, emily]).unwrap();
            assert!(outcome.is_complete());

            let members: Vec<i64> = controller.family_members(group).iter().map(PersonRecord::id).collect();
            assert_eq!(members, vec![jay, emily]);

            controller.leave_family(group, jay).unwrap();

            let members: Vec<i64> = controller.family_members(group).iter().map(PersonRecord::id).collect();
            assert_eq!(members, vec![emily]);
            assert_eq!(controller.person(jay).unwrap().person().family_group(), None);
            assert_eq!(controller.person(emily).unwrap().person().family_group(), Some(group));
        }

        it "rejects an empty family" {
            let err = controller.form_family(&[]).unwrap_err();
            assert!(matches!(err, Error::Validation(ValidationError::EmptyFamilyGroup)));
            assert!(controller.family_groups().is_empty());
        }

        it "rejects removing a non-member" {
            let (group, _) = controller.form_family(&[jay]).unwrap();
            let err = controller.leave_family(group, emily).unwrap_err();
            assert!(matches!(err, Error::Validation(ValidationError::NotAMember(id)) if id == emily));
        }

        it "keeps the first family as the back reference" {
            let (first, _) = controller.form_family(&[jay]).unwrap();
            let (second, _) = controller.form_family(&[emily]).unwrap();

            controller.join_family(second, jay).unwrap();

            assert_eq!(controller.families_of(jay).len(), 2);
            assert_eq!(controller.person(jay).unwrap().person().family_group(), Some(first));
            let stored = Store::<PersonRecord>::read_by_id(controller.store(), jay).unwrap().unwrap();
            assert_eq!(stored.person().family_group(), Some(first));
        }
    }

    describe "shelter workflows" {
        before {
            let mut controller = empty_controller();
            let victim = add_victim(&mut controller, "Emily", "Fall");
            let location = add_shelter(&mut controller);
            controller.admit_occupant(location, victim).unwrap();
        }

        it "admits and discharges occupants" {
            assert_eq!(controller.occupants_of(location).len(), 1);
            assert_eq!(controller.locations_of(victim).len(), 1);

            controller.discharge_occupant(location, victim).unwrap();

            assert!(controller.occupants_of(location).is_empty());
            assert!(controller.store().occupants_at(location).unwrap().is_empty());
        }

        it "only admits victims" {
            let bystander = add_person(&mut controller, "Jay", "Luck");
            let err = controller.admit_occupant(location, bystander).unwrap_err();
            assert!(matches!(err, Error::Validation(ValidationError::NotAVictim(id)) if id == bystander));
        }

        it "transfers a blanket to the victim" {
            let blanket = Supply::blanket(controller.ids(), "Wool blanket", "bedding").unwrap();
            let blanket_id = blanket.id();
            assert!(controller.stock_location(location, blanket).unwrap().is_complete());

            let outcome = controller.allocate_supply(location, victim, blanket_id, date("2024-02-10")).unwrap();

            assert!(outcome.is_complete());
            assert!(!controller.location(location).unwrap().has_item(blanket_id));
            let holder = controller.person(victim).unwrap();
            assert!(holder.as_victim().unwrap().has_item(blanket_id));
            let stored = controller.store().supplies_for_person(victim).unwrap();
            assert_eq!(stored.len(), 1);
            assert!(controller.store().supplies_for_location(location).unwrap().is_empty());
        }

        it "consumes water and stamps the allocation date" {
            let water = Supply::water(controller.ids(), "Bottled water", "drink").unwrap();
            let water_id = water.id();
            controller.stock_location(location, water).unwrap();

            controller.allocate_supply(location, victim, water_id, date("2024-02-10")).unwrap();

            assert!(!controller.location(location).unwrap().has_item(water_id));
            let holder = controller.person(victim).unwrap();
            assert!(!holder.as_victim().unwrap().has_item(water_id));
            assert_eq!(controller.supply(water_id).unwrap().allocation_date(), Some(date("2024-02-10")));
            let stored = Store::<Supply>::read_by_id(controller.store(), water_id).unwrap().unwrap();
            assert_eq!(stored.allocation_date(), Some(date("2024-02-10")));
        }

        it "carries a supply rename into the held copies" {
            let blanket = Supply::blanket(controller.ids(), "Wool blanket", "bedding").unwrap();
            let blanket_id = blanket.id();
            controller.stock_location(location, blanket).unwrap();

            let mut renamed = controller.supply(blanket_id).unwrap();
            renamed.set_name("Fleece blanket").unwrap();
            assert!(controller.update_supply(renamed).is_complete());
            let second = add_victim(&mut controller, "Jay", "Luck");
            assert!(controller.admit_occupant(location, second).unwrap().is_complete());

            assert_eq!(controller.location(location).unwrap().inventory()[0].name(), "Fleece blanket");
            let stored = Store::<Supply>::read_by_id(controller.store(), blanket_id).unwrap().unwrap();
            assert_eq!(stored.name(), "Fleece blanket");
            let held = controller.store().supplies_for_location(location).unwrap();
            assert_eq!(held[0].name(), "Fleece blanket");
        }

        it "rejects stocking a supply someone already holds" {
            let blanket = Supply::blanket(controller.ids(), "Wool blanket", "bedding").unwrap();
            let blanket_id = blanket.id();
            controller.stock_location(location, blanket).unwrap();
            controller.allocate_supply(location, victim, blanket_id, date("2024-02-10")).unwrap();

            let again = controller.supply(blanket_id).unwrap();
            let err = controller.stock_location(location, again).unwrap_err();

            assert!(matches!(err, Error::Validation(ValidationError::AlreadyHeld(id)) if id == blanket_id));
            assert!(!controller.location(location).unwrap().has_item(blanket_id));
            assert!(controller.person(victim).unwrap().as_victim().unwrap().has_item(blanket_id));
            assert_eq!(controller.store().supplies_for_person(victim).unwrap().len(), 1);
            assert!(controller.store().supplies_for_location(location).unwrap().is_empty());
        }

        it "never stocks personal belongings" {
            let album = Supply::personal_belonging(controller.ids(), "Photo album", "keepsake", "Blue cover").unwrap();
            let err = controller.stock_location(location, album).unwrap_err();
            assert!(matches!(err, Error::Validation(ValidationError::PersonalBelonging(_))));
            assert!(controller.supplies().is_empty());
        }

        it "rejects allocating a supply the location does not hold" {
            let err = controller.allocate_supply(location, victim, 999, date("2024-02-10")).unwrap_err();
            assert!(matches!(err, Error::Validation(ValidationError::NotInInventory(999))));
        }

        it "records treatments against the person" {
            let (record, outcome) = controller
                .record_treatment(victim, location, "Set broken arm", "2024-01-15 09:30:00")
                .unwrap();

            assert!(outcome.is_complete());
            assert_eq!(controller.person(victim).unwrap().person().medical_records(), &[record]);
            assert_eq!(controller.medical_records_for_location(location).len(), 1);
            let stored = controller.medical_records_for_person(victim);
            assert_eq!(stored[0].date_of_treatment(), date("2024-01-15"));
        }

        it "files inquiries only about victims" {
            let inquirer = add_person(&mut controller, "Jay", "Luck");

            let (inquiry, _) = controller
                .file_inquiry(inquirer, victim, "2024-02-01", "Last seen near the bridge", location)
                .unwrap();
            assert_eq!(controller.inquiries_by_inquirer(inquirer)[0].id(), inquiry);
            assert_eq!(controller.inquiries_for_missing_person(victim).len(), 1);
            assert_eq!(controller.inquiries_for_location(location).len(), 1);

            let err = controller
                .file_inquiry(victim, inquirer, "2024-02-01", "Looking for him", location)
                .unwrap_err();
            assert!(matches!(err, Error::Validation(ValidationError::NotAVictim(id)) if id == inquirer));
        }
    }

    describe "deletes" {
        before {
            let mut controller = empty_controller();
            let victim = add_victim(&mut controller, "Emily", "Fall");
            let location = add_shelter(&mut controller);
        }

        it "removes a supply from the catalog and its holder" {
            let soap = Supply::generic(controller.ids(), "Soap", "hygiene").unwrap();
            let soap_id = soap.id();
            controller.stock_location(location, soap).unwrap();

            let outcome = controller.delete_supply(soap_id);

            assert!(outcome.is_complete());
            assert!(controller.supply(soap_id).is_none());
            assert!(!controller.location(location).unwrap().has_item(soap_id));
            assert!(Store::<Supply>::read_by_id(controller.store(), soap_id).unwrap().is_none());
            assert!(controller.store().supplies_for_location(location).unwrap().is_empty());
        }

        it "clears the back reference of every member" {
            let jay = add_person(&mut controller, "Jay", "Luck");
            let (group, _) = controller.form_family(&[jay, victim]).unwrap();

            let outcome = controller.delete_family_group(group);

            assert!(outcome.is_complete());
            assert!(controller.family_group(group).is_none());
            assert!(controller.families_of(jay).is_empty());
            for id in [jay, victim] {
                assert_eq!(controller.person(id).unwrap().person().family_group(), None);
                let stored = Store::<PersonRecord>::read_by_id(controller.store(), id).unwrap().unwrap();
                assert_eq!(stored.person().family_group(), None);
            }
        }

        it "drops a location with its occupancy" {
            controller.admit_occupant(location, victim).unwrap();

            let outcome = controller.delete_location(location);

            assert!(outcome.is_complete());
            assert!(controller.location(location).is_none());
            assert!(controller.locations_of(victim).is_empty());
            assert!(Store::<Location>::read_by_id(controller.store(), location).unwrap().is_none());
            assert!(controller.store().occupants_at(location).unwrap().is_empty());
            assert!(controller.person(victim).is_some());
        }
    }

    describe "delete_person" {
        it "cascades through every collection" {
            let mut controller = empty_controller();
            let victim = add_victim(&mut controller, "Emily", "Fall");
            let inquirer = add_person(&mut controller, "Jay", "Luck");
            let location = add_shelter(&mut controller);
            controller.admit_occupant(location, victim).unwrap();
            let (group, _) = controller.form_family(&[inquirer, victim]).unwrap();
            controller.record_treatment(victim, location, "Stitches", "2024-01-15").unwrap();
            controller.file_inquiry(inquirer, victim, "2024-02-01", "Looking for her", location).unwrap();

            let report = controller.delete_person(victim).unwrap();

            assert_eq!(report.medical_records, 1);
            assert_eq!(report.inquiries, 1);
            assert!(controller.person(victim).is_none());
            assert!(controller.occupants_of(location).is_empty());
            assert!(controller.medical_records().is_empty());
            assert!(controller.inquiries().is_empty());
            let members: Vec<i64> = controller.family_members(group).iter().map(PersonRecord::id).collect();
            assert_eq!(members, vec![inquirer]);
        }

        it "rejects unknown people" {
            let mut controller = empty_controller();
            let err = controller.delete_person(42).unwrap_err();
            assert!(matches!(err, Error::Validation(ValidationError::UnknownEntity { kind: EntityKind::Person, id: 42 })));
        }

        it "leaves nothing half-deleted when the store fails" {
            let (_dir, mut controller, raw) = file_controller();
            let victim = add_victim(&mut controller, "Emily", "Fall");
            let inquirer = add_person(&mut controller, "Jay", "Luck");
            let location = add_shelter(&mut controller);
            controller.admit_occupant(location, victim).unwrap();
            controller.record_treatment(victim, location, "Stitches", "2024-01-15").unwrap();
            controller.file_inquiry(inquirer, victim, "2024-02-01", "Looking for her", location).unwrap();
            fail_on(&raw, "DELETE", "people");

            let err = controller.delete_person(victim).unwrap_err();

            assert!(err.is_persistence());
            assert!(controller.person(victim).is_some());
            assert_eq!(controller.occupants_of(location).len(), 1);
            assert_eq!(controller.medical_records_for_person(victim).len(), 1);
            assert_eq!(controller.inquiries_for_missing_person(victim).len(), 1);

            let store = controller.store();
            assert!(Store::<PersonRecord>::read_by_id(store, victim).unwrap().is_some());
            assert_eq!(store.occupants_at(location).unwrap(), vec![victim]);
            assert_eq!(store.medical_records_for_person(victim).unwrap().len(), 1);
            assert_eq!(store.inquiries_for_missing_person(victim).unwrap().len(), 1);
        }
    }

    describe "persistence" {
        it "reloads what was written and moves ids past it" {
            let (dir, mut controller, _raw) = file_controller();
            let victim = add_victim(&mut controller, "Emily", "Fall");
            let location = add_shelter(&mut controller);
            controller.admit_occupant(location, victim).unwrap();
            drop(controller);

            let db = Database::open(dir.path().join("relief.db")).unwrap();
            let reloaded = Controller::load(db, IdAllocator::new()).unwrap();

            assert_eq!(reloaded.people().len(), 1);
            assert_eq!(reloaded.location(location).unwrap().occupants(), &[victim]);
            assert_eq!(reloaded.ids().peek(EntityKind::Person), victim + 1);
            assert_eq!(reloaded.ids().peek(EntityKind::Location), location + 1);
        }

        it "keeps a failed create in memory and recycles its id" {
            let (_dir, mut controller, raw) = file_controller();
            fail_on(&raw, "INSERT", "locations");

            let location = Location::new(controller.ids(), "Riverside Shelter", "40 Bow Trail SW").unwrap();
            let failed_id = location.id();
            let outcome = controller.add_location(location);

            assert!(outcome.local_applied);
            assert!(!outcome.persisted);
            assert!(outcome.failure.is_some());
            assert!(controller.location(failed_id).is_some());
            assert_eq!(controller.ids().peek(EntityKind::Location), failed_id);
        }

        it "reports a failed update without undoing it" {
            let (_dir, mut controller, raw) = file_controller();
            let location = add_shelter(&mut controller);
            fail_on(&raw, "UPDATE", "locations");

            let mut renamed = controller.location(location).unwrap();
            renamed.set_name("Hilltop Shelter").unwrap();
            let outcome = controller.update_location(renamed);

            assert!(outcome.local_applied);
            assert!(!outcome.persisted);
            assert!(outcome.into_result().unwrap_err().is_persistence());
            assert_eq!(controller.location(location).unwrap().name(), "Hilltop Shelter");
            let stored = Store::<Location>::read_by_id(controller.store(), location).unwrap().unwrap();
            assert_eq!(stored.name(), "Riverside Shelter");
        }
    }
}
