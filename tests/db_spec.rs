use relief_tracker::db::Database;
use relief_tracker::ids::IdAllocator;
use relief_tracker::models::*;
use relief_tracker::store::{CascadeReport, Relations, Store};
use speculate2::speculate;

fn create_shelter(db: &Database, ids: &IdAllocator) -> Location {
    let location = Location::new(ids, "Riverside Shelter", "40 Bow Trail SW")
        .expect("Failed to build location");
    db.create(&location).expect("Failed to create location");
    location
}

fn create_victim(db: &Database, ids: &IdAllocator, first: &str, last: &str) -> DisasterVictim {
    let victim = DisasterVictim::new(ids, first, last).expect("Failed to build victim");
    db.create(&PersonRecord::from(victim.clone()))
        .expect("Failed to create victim");
    victim
}

fn read_person(db: &Database, id: i64) -> Option<PersonRecord> {
    Store::<PersonRecord>::read_by_id(db, id).expect("Query failed")
}

fn read_location(db: &Database, id: i64) -> Option<Location> {
    Store::<Location>::read_by_id(db, id).expect("Query failed")
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let ids = IdAllocator::new();
    }

    describe "people" {
        it "round-trips a person with every optional field" {
            let mut person = Person::with_birth_date(&ids, "Jay", "Luck", "1990-04-12").unwrap();
            person.set_gender("man").unwrap();
            person.set_comments("Arrived by boat").unwrap();
            person.set_phone_number("403-555-0199");
            let record = PersonRecord::from(person);

            db.create(&record).expect("Failed to create");

            assert_eq!(read_person(&db, record.id()), Some(record));
        }

        it "round-trips a victim with a personal inventory" {
            let mut victim = DisasterVictim::new(&ids, "Emily", "Fall").unwrap();
            victim.add_item(Supply::personal_belonging(&ids, "Photo album", "keepsake", "Blue leather cover").unwrap());
            victim.add_item(Supply::blanket(&ids, "Wool blanket", "bedding").unwrap());
            let record = PersonRecord::from(victim.clone());

            db.create(&record).expect("Failed to create");

            let found = read_person(&db, victim.id()).expect("Person missing");
            assert!(found.is_victim());
            assert_eq!(found.as_victim().unwrap().personal_inventory(), victim.personal_inventory());
        }

        it "returns None for an unknown id" {
            assert!(read_person(&db, 999).is_none());
        }

        it "updates names and inventory" {
            let mut victim = create_victim(&db, &ids, "Emily", "Fall");
            victim.set_last_name("Winter").unwrap();
            victim.add_item(Supply::generic(&ids, "Soap", "hygiene").unwrap());

            let updated = Store::<PersonRecord>::update(&db, &PersonRecord::from(victim.clone()))
                .expect("Update failed");

            assert!(updated);
            let found = read_person(&db, victim.id()).unwrap();
            assert_eq!(found.person().last_name(), "Winter");
            assert_eq!(found.as_victim().unwrap().personal_inventory().len(), 1);
        }

        it "reports updates and deletes of unknown people" {
            let stranger = PersonRecord::from(Person::new(&ids, "Sam", "Rowe").unwrap());
            assert!(!Store::<PersonRecord>::update(&db, &stranger).unwrap());
            assert!(!Store::<PersonRecord>::delete(&db, stranger.id()).unwrap());
        }

        it "lists people in id order" {
            let first = create_victim(&db, &ids, "Emily", "Fall");
            let second = create_victim(&db, &ids, "Jay", "Luck");

            let all: Vec<PersonRecord> = db.read_all().unwrap();
            let found: Vec<i64> = all.iter().map(PersonRecord::id).collect();
            assert_eq!(found, vec![first.id(), second.id()]);
        }
    }

    describe "supplies" {
        it "round-trips each kind" {
            let mut water = Supply::water(&ids, "Bottled water", "drink").unwrap();
            water.set_allocation_date("2024-02-10").unwrap();
            let supplies = vec![
                Supply::generic(&ids, "Soap", "hygiene").unwrap(),
                Supply::blanket(&ids, "Wool blanket", "bedding").unwrap(),
                Supply::cot(&ids, "Folding cot", "bedding", "Gym", "B4").unwrap(),
                Supply::personal_belonging(&ids, "Photo album", "keepsake", "Blue cover").unwrap(),
                water,
            ];
            for supply in &supplies {
                db.create(supply).expect("Failed to create");
            }

            let all: Vec<Supply> = db.read_all().unwrap();
            assert_eq!(all, supplies);
        }

        it "updates kind-specific fields" {
            let mut cot = Supply::cot(&ids, "Folding cot", "bedding", "Gym", "B4").unwrap();
            db.create(&cot).unwrap();
            cot.set_grid_location("C1").unwrap();

            assert!(Store::<Supply>::update(&db, &cot).unwrap());
            let found = Store::<Supply>::read_by_id(&db, cot.id()).unwrap().unwrap();
            assert_eq!(found.grid_location(), Some("C1"));
        }

        it "deleting a supply removes it from inventories" {
            let mut location = create_shelter(&db, &ids);
            let blanket = Supply::blanket(&ids, "Wool blanket", "bedding").unwrap();
            location.add_item(blanket.clone()).unwrap();
            Store::<Location>::update(&db, &location).unwrap();

            assert!(Store::<Supply>::delete(&db, blanket.id()).unwrap());

            assert!(db.supplies_for_location(location.id()).unwrap().is_empty());
            assert!(read_location(&db, location.id()).unwrap().inventory().is_empty());
        }
    }

    describe "locations" {
        it "keeps occupants and inventory in order" {
            let mut location = create_shelter(&db, &ids);
            let emily = create_victim(&db, &ids, "Emily", "Fall");
            let jay = create_victim(&db, &ids, "Jay", "Luck");
            location.add_occupant(&jay);
            location.add_occupant(&emily);
            let cot = Supply::cot(&ids, "Folding cot", "bedding", "Gym", "B4").unwrap();
            let water = Supply::water(&ids, "Bottled water", "drink").unwrap();
            location.add_item(cot.clone()).unwrap();
            location.add_item(water.clone()).unwrap();

            assert!(Store::<Location>::update(&db, &location).unwrap());

            let found = read_location(&db, location.id()).unwrap();
            assert_eq!(found.occupants(), &[jay.id(), emily.id()]);
            assert_eq!(found.inventory(), &[cot, water]);
            assert_eq!(db.occupants_at(location.id()).unwrap(), vec![jay.id(), emily.id()]);
        }

        it "moves a supply from a location to a victim" {
            let mut location = create_shelter(&db, &ids);
            let mut victim = create_victim(&db, &ids, "Emily", "Fall");
            let blanket = Supply::blanket(&ids, "Wool blanket", "bedding").unwrap();
            location.add_item(blanket.clone()).unwrap();
            Store::<Location>::update(&db, &location).unwrap();

            location.allocate_item(&mut victim, blanket.id()).unwrap();
            Store::<Location>::update(&db, &location).unwrap();
            Store::<PersonRecord>::update(&db, &PersonRecord::from(victim.clone())).unwrap();

            assert!(db.supplies_for_location(location.id()).unwrap().is_empty());
            assert_eq!(db.supplies_for_person(victim.id()).unwrap(), vec![blanket]);
        }

        it "deletes a location with its memberships" {
            let mut location = create_shelter(&db, &ids);
            let victim = create_victim(&db, &ids, "Emily", "Fall");
            location.add_occupant(&victim);
            Store::<Location>::update(&db, &location).unwrap();

            assert!(Store::<Location>::delete(&db, location.id()).unwrap());
            assert!(read_location(&db, location.id()).is_none());
            assert!(db.occupants_at(location.id()).unwrap().is_empty());
        }
    }

    describe "family groups" {
        it "round-trips members in order" {
            let jay = Person::new(&ids, "Jay", "Luck").unwrap();
            let emily = Person::new(&ids, "Emily", "Fall").unwrap();
            let group = FamilyGroup::new(&ids, &[&jay, &emily]).unwrap();

            db.create(&group).unwrap();

            let found = Store::<FamilyGroup>::read_by_id(&db, group.id()).unwrap().unwrap();
            assert_eq!(found.members(), &[jay.id(), emily.id()]);
        }

        it "clears members' back reference on delete" {
            let mut jay = Person::new(&ids, "Jay", "Luck").unwrap();
            let group = FamilyGroup::new(&ids, &[&jay]).unwrap();
            jay.try_set_family_group(group.id());
            db.create(&PersonRecord::from(jay.clone())).unwrap();
            db.create(&group).unwrap();

            assert!(Store::<FamilyGroup>::delete(&db, group.id()).unwrap());

            let found = read_person(&db, jay.id()).unwrap();
            assert_eq!(found.person().family_group(), None);
        }
    }

    describe "records and inquiries" {
        it "finds medical records by person and location" {
            let location = create_shelter(&db, &ids);
            let victim = create_victim(&db, &ids, "Emily", "Fall");
            let record = MedicalRecord::new(&ids, &victim, &location, "Set broken arm", "2024-01-15T09:30:00Z").unwrap();
            db.create(&record).unwrap();

            assert_eq!(db.medical_records_for_person(victim.id()).unwrap(), vec![record.clone()]);
            assert_eq!(db.medical_records_for_location(location.id()).unwrap(), vec![record]);

            let found = read_person(&db, victim.id()).unwrap();
            assert_eq!(found.person().medical_records().len(), 1);
        }

        it "finds inquiries by each participant" {
            let location = create_shelter(&db, &ids);
            let missing = create_victim(&db, &ids, "Emily", "Fall");
            let inquirer = Person::new(&ids, "Jay", "Luck").unwrap();
            db.create(&PersonRecord::from(inquirer.clone())).unwrap();
            let inquiry = Inquiry::new(&ids, &inquirer, &missing, "2024-02-01", "Last seen near the bridge", &location).unwrap();
            db.create(&inquiry).unwrap();

            assert_eq!(db.inquiries_by_inquirer(inquirer.id()).unwrap(), vec![inquiry.clone()]);
            assert_eq!(db.inquiries_for_missing_person(missing.id()).unwrap(), vec![inquiry.clone()]);
            assert_eq!(db.inquiries_for_location(location.id()).unwrap(), vec![inquiry]);
            assert!(db.inquiries_by_inquirer(missing.id()).unwrap().is_empty());
        }
    }

    describe "delete_person_cascade" {
        it "removes the person and everything that references them" {
            let mut location = create_shelter(&db, &ids);
            let mut victim = DisasterVictim::new(&ids, "Emily", "Fall").unwrap();
            victim.add_item(Supply::blanket(&ids, "Wool blanket", "bedding").unwrap());
            let group = FamilyGroup::new(&ids, &[victim.person()]).unwrap();
            victim.try_set_family_group(group.id());
            db.create(&PersonRecord::from(victim.clone())).unwrap();
            db.create(&group).unwrap();
            location.add_occupant(&victim);
            Store::<Location>::update(&db, &location).unwrap();

            let inquirer = Person::new(&ids, "Jay", "Luck").unwrap();
            db.create(&PersonRecord::from(inquirer.clone())).unwrap();
            db.create(&MedicalRecord::new(&ids, &victim, &location, "Stitches", "2024-01-15").unwrap()).unwrap();
            db.create(&Inquiry::new(&ids, &inquirer, &victim, "2024-02-01", "Looking for her", &location).unwrap()).unwrap();

            let report = db.delete_person_cascade(victim.id()).expect("Cascade failed");

            assert_eq!(report, CascadeReport {
                medical_records: 1,
                location_memberships: 1,
                supply_allocations: 1,
                family_memberships: 1,
                inquiries: 1,
            });
            assert!(read_person(&db, victim.id()).is_none());
            assert!(read_location(&db, location.id()).unwrap().occupants().is_empty());
            assert!(Store::<FamilyGroup>::read_by_id(&db, group.id()).unwrap().unwrap().members().is_empty());
            assert!(read_person(&db, inquirer.id()).is_some());
            let supplies: Vec<Supply> = db.read_all().unwrap();
            assert_eq!(supplies.len(), 1);
        }

        it "reports nothing for a person with no references" {
            let victim = create_victim(&db, &ids, "Emily", "Fall");
            let report = db.delete_person_cascade(victim.id()).unwrap();
            assert_eq!(report, CascadeReport::default());
            assert!(read_person(&db, victim.id()).is_none());
        }
    }
}
