//! Record store for owners, pets, and veterinarians.
//!
//! [`ClinicStore`] is the contract the facade and the index bootstrap rely
//! on. [`InMemoryClinicStore`] is the bundled implementation: a mutex-guarded
//! map with store-assigned ids, seeded with the classic clinic data set via
//! [`InMemoryClinicStore::seeded`].

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::error::ClinicError;
use crate::model::{Owner, Pet, PetType, Vet};

/// A page of records: zero-based page number plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub size: usize,
}

impl PageRequest {
    pub fn of(page: usize, size: usize) -> Self {
        Self { page, size }
    }

    /// A single page holding every record.
    pub fn unpaged() -> Self {
        Self {
            page: 0,
            size: usize::MAX,
        }
    }

    fn apply<T: Clone>(&self, records: impl Iterator<Item = T>) -> Vec<T> {
        records
            .skip(self.page.saturating_mul(self.size))
            .take(self.size)
            .collect()
    }
}

/// Persistence operations the assistant needs. Each call is atomic for the
/// single record it touches.
pub trait ClinicStore: Send + Sync {
    /// Owners in id order, one page at a time.
    fn find_owners(&self, page: PageRequest) -> Result<Vec<Owner>, ClinicError>;

    /// Look up an owner by id. `Ok(None)` when no such owner exists.
    fn find_owner(&self, id: i32) -> Result<Option<Owner>, ClinicError>;

    /// Insert or update an owner. Assigns ids to the owner (when new) and to
    /// any new pets, and returns the stored record.
    fn save_owner(&self, owner: Owner) -> Result<Owner, ClinicError>;

    /// Append a new pet to an existing owner in one step, assigning the pet
    /// an id. Concurrent adds to the same owner all persist.
    /// `NotFound` when the owner does not exist.
    fn add_pet(&self, owner_id: i32, pet: Pet) -> Result<Owner, ClinicError>;

    /// Veterinarians in id order, one page at a time.
    fn find_vets(&self, page: PageRequest) -> Result<Vec<Vet>, ClinicError>;
}

#[derive(Default)]
struct Tables {
    owners: BTreeMap<i32, Owner>,
    vets: BTreeMap<i32, Vet>,
    next_owner_id: i32,
    next_pet_id: i32,
    next_vet_id: i32,
}

/// In-memory [`ClinicStore`].
#[derive(Default)]
pub struct InMemoryClinicStore {
    tables: Mutex<Tables>,
}

impl InMemoryClinicStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the clinic's standard data set: 10 owners with their
    /// 13 pets and 6 veterinarians.
    pub fn seeded() -> Self {
        let store = Self::new();
        for (first, last, address, city, telephone, pets) in SEED_OWNERS {
            let mut owner = Owner::new(*first, *last, *address, *city, *telephone);
            for (name, pet_type, (y, m, d)) in *pets {
                owner.add_pet(Pet::new(*name, *pet_type, NaiveDate::from_ymd_opt(*y, *m, *d)));
            }
            if let Err(e) = store.save_owner(owner) {
                warn!("Skipping seed owner {first} {last}: {e}");
            }
        }
        for (first, last, specialties) in SEED_VETS {
            let vet = specialties
                .iter()
                .fold(Vet::new(*first, *last), |vet, s| vet.with_specialty(*s));
            store.insert_vet(vet);
        }
        store
    }

    /// Add a veterinarian, assigning ids to it and its specialties.
    pub fn insert_vet(&self, mut vet: Vet) -> Vet {
        let mut tables = self.lock();
        let id = match vet.id {
            Some(id) => id,
            None => {
                tables.next_vet_id += 1;
                tables.next_vet_id
            }
        };
        tables.next_vet_id = tables.next_vet_id.max(id);
        vet.id = Some(id);
        for specialty in &mut vet.specialties {
            if specialty.id.is_none() {
                specialty.id = specialty_id(&specialty.name);
            }
        }
        tables.vets.insert(id, vet.clone());
        vet
    }

    /// Number of stored owners.
    pub fn owner_count(&self) -> usize {
        self.lock().owners.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ClinicStore for InMemoryClinicStore {
    fn find_owners(&self, page: PageRequest) -> Result<Vec<Owner>, ClinicError> {
        Ok(page.apply(self.lock().owners.values().cloned()))
    }

    fn find_owner(&self, id: i32) -> Result<Option<Owner>, ClinicError> {
        Ok(self.lock().owners.get(&id).cloned())
    }

    fn save_owner(&self, mut owner: Owner) -> Result<Owner, ClinicError> {
        owner.validate()?;
        let mut tables = self.lock();

        // An id that does not resolve is treated as a new owner.
        let id = match owner.id {
            Some(id) if tables.owners.contains_key(&id) => id,
            _ => {
                tables.next_owner_id += 1;
                tables.next_owner_id
            }
        };
        owner.id = Some(id);

        for pet in owner.pets.iter_mut().filter(|p| p.is_new()) {
            tables.next_pet_id += 1;
            pet.id = Some(tables.next_pet_id);
        }

        debug!("Saved owner {id} ({} pets)", owner.pets.len());
        tables.owners.insert(id, owner.clone());
        Ok(owner)
    }

    fn add_pet(&self, owner_id: i32, mut pet: Pet) -> Result<Owner, ClinicError> {
        let mut guard = self.lock();
        let tables = &mut *guard;
        let owner = tables.owners.get_mut(&owner_id).ok_or(ClinicError::NotFound {
            entity: "owner",
            id: owner_id,
        })?;
        tables.next_pet_id += 1;
        pet.id = Some(tables.next_pet_id);
        debug!("Added pet {} to owner {owner_id}", tables.next_pet_id);
        owner.add_pet(pet);
        Ok(owner.clone())
    }

    fn find_vets(&self, page: PageRequest) -> Result<Vec<Vet>, ClinicError> {
        Ok(page.apply(self.lock().vets.values().cloned()))
    }
}

fn specialty_id(name: &str) -> Option<i32> {
    SEED_SPECIALTIES
        .iter()
        .find(|(_, known)| known.eq_ignore_ascii_case(name))
        .map(|(id, _)| *id)
}

// ── Seed data ──────────────────────────────────────────────────────

type SeedPet = (&'static str, PetType, (i32, u32, u32));
type SeedOwner = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static [SeedPet],
);

const SEED_SPECIALTIES: &[(i32, &str)] = &[(1, "radiology"), (2, "surgery"), (3, "dentistry")];

#[rustfmt::skip]
const SEED_OWNERS: &[SeedOwner] = &[
    ("George", "Franklin", "110 W. Liberty St.", "Madison", "6085551023",
        &[("Leo", PetType::Cat, (2010, 9, 7))]),
    ("Betty", "Davis", "638 Cardinal Ave.", "Sun Prairie", "6085551749",
        &[("Basil", PetType::Hamster, (2012, 8, 6))]),
    ("Eduardo", "Rodriquez", "2693 Commerce St.", "McFarland", "6085558763",
        &[("Rosy", PetType::Dog, (2011, 4, 17)), ("Jewel", PetType::Dog, (2010, 3, 7))]),
    ("Harold", "Davis", "563 Friendly St.", "Windsor", "6085553198",
        &[("Iggy", PetType::Lizard, (2010, 11, 30))]),
    ("Peter", "McTavish", "2387 S. Fair Way", "Madison", "6085552765",
        &[("George", PetType::Snake, (2010, 1, 20))]),
    ("Jean", "Coleman", "105 N. Lake St.", "Monona", "6085552654",
        &[("Samantha", PetType::Cat, (2012, 9, 4)), ("Max", PetType::Cat, (2012, 9, 4))]),
    ("Jeff", "Black", "1450 Oak Blvd.", "Monona", "6085555387",
        &[("Lucky", PetType::Bird, (2011, 8, 6))]),
    ("Maria", "Escobito", "345 Maple St.", "Madison", "6085557683",
        &[("Mulligan", PetType::Dog, (2007, 2, 24))]),
    ("David", "Schroeder", "2749 Blackhawk Trail", "Madison", "6085559435",
        &[("Freddy", PetType::Bird, (2010, 3, 9))]),
    ("Carlos", "Estaban", "2335 Independence La.", "Waunakee", "6085555487",
        &[("Lucky", PetType::Dog, (2010, 6, 24)), ("Sly", PetType::Cat, (2012, 6, 8))]),
];

const SEED_VETS: &[(&str, &str, &[&str])] = &[
    ("James", "Carter", &[]),
    ("Helen", "Leary", &["radiology"]),
    ("Linda", "Douglas", &["surgery", "dentistry"]),
    ("Rafael", "Ortega", &["surgery"]),
    ("Henry", "Stevens", &["radiology"]),
    ("Sharon", "Jenkins", &[]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_store_has_standard_data() {
        let store = InMemoryClinicStore::seeded();
        assert_eq!(store.owner_count(), 10);
        let vets = store.find_vets(PageRequest::unpaged()).unwrap();
        assert_eq!(vets.len(), 6);
        assert_eq!(vets[2].last_name, "Douglas");
        assert_eq!(vets[2].specialties.len(), 2);

        let coleman = store.find_owner(6).unwrap().unwrap();
        assert_eq!(coleman.last_name, "Coleman");
        assert_eq!(coleman.pets.len(), 2);
        assert!(coleman.pets.iter().all(|p| p.id.is_some()));
    }

    #[test]
    fn save_assigns_owner_and_pet_ids() {
        let store = InMemoryClinicStore::new();
        let mut owner = Owner::new("Ada", "Lovelace", "1 Analytical Way", "London", "0123456789");
        owner.add_pet(Pet::new("Babbage", PetType::Cat, None));

        let saved = store.save_owner(owner).unwrap();
        assert_eq!(saved.id, Some(1));
        assert_eq!(saved.pets[0].id, Some(1));
    }

    #[test]
    fn save_with_unknown_id_creates_new_owner() {
        let store = InMemoryClinicStore::seeded();
        let mut owner = Owner::new("Ada", "Lovelace", "1 Analytical Way", "London", "0123456789");
        owner.id = Some(500);
        let saved = store.save_owner(owner).unwrap();
        assert_eq!(saved.id, Some(11));
        assert!(store.find_owner(500).unwrap().is_none());
    }

    #[test]
    fn save_rejects_invalid_owner() {
        let store = InMemoryClinicStore::new();
        let owner = Owner::new("Ada", "Lovelace", "1 Analytical Way", "London", "12");
        assert!(matches!(
            store.save_owner(owner),
            Err(ClinicError::Validation(_))
        ));
        assert_eq!(store.owner_count(), 0);
    }

    #[test]
    fn paging_skips_and_limits() {
        let store = InMemoryClinicStore::seeded();
        let first = store.find_owners(PageRequest::of(0, 4)).unwrap();
        let third = store.find_owners(PageRequest::of(2, 4)).unwrap();
        assert_eq!(first.len(), 4);
        assert_eq!(third.len(), 2);
        assert_eq!(third[0].id, Some(9));
    }

    #[test]
    fn add_pet_appends_under_one_lock() {
        let store = InMemoryClinicStore::seeded();
        let owner = store
            .add_pet(1, Pet::new("Tom", PetType::Cat, None))
            .unwrap();
        assert_eq!(owner.pets.len(), 2);
        assert_eq!(owner.pet("Tom").unwrap().id, Some(14));
        assert_eq!(store.find_owner(1).unwrap().unwrap().pets.len(), 2);
    }

    #[test]
    fn add_pet_to_missing_owner_is_not_found() {
        let store = InMemoryClinicStore::seeded();
        let err = store.add_pet(77, Pet::new("Tom", PetType::Cat, None)).unwrap_err();
        assert_eq!(err, ClinicError::NotFound { entity: "owner", id: 77 });
    }

    #[test]
    fn concurrent_add_pet_keeps_every_pet() {
        let store = std::sync::Arc::new(InMemoryClinicStore::seeded());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .add_pet(1, Pet::new(format!("Pet{n}"), PetType::Dog, None))
                        .unwrap()
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let owner = store.find_owner(1).unwrap().unwrap();
        assert_eq!(owner.pets.len(), 9);
        let mut ids: Vec<_> = owner.pets.iter().filter_map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn insert_vet_keeps_explicit_id() {
        let store = InMemoryClinicStore::new();
        let mut vet = Vet::new("Lee", "Dr").with_specialty("surgery");
        vet.id = Some(7);
        let stored = store.insert_vet(vet);
        assert_eq!(stored.id, Some(7));
        let next = store.insert_vet(Vet::new("Park", "Dr"));
        assert_eq!(next.id, Some(8));
    }
}
