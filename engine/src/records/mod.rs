//! Authoritative fort and station records.
//!
//! Gyms and pokestops share one id space, so the record store holds a single
//! [`FortRecord`] per id and reclassification swaps the variant under the same lock.

mod common;
mod gym;
mod pokestop;
mod station;

pub use common::FortCommon;
pub use common::power_up_level;
pub use gym::Gym;
pub use pokestop::ContestState;
pub use pokestop::Incident;
pub use pokestop::Pokestop;
pub use pokestop::QuestSlot;
pub use station::Station;

use crate::lookup::FortLookup;
use crate::store::StoredRecord;
use fortwatch_wire::FortType;
use fortwatch_wire::FortWebhook;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FortRecord {
    Gym(Gym),
    Pokestop(Pokestop),
}

impl FortRecord {
    pub fn empty(id: &str, fort_type: FortType) -> Self {
        match fort_type {
            FortType::Gym => Self::Gym(Gym::new(id)),
            FortType::Pokestop => Self::Pokestop(Pokestop::new(id)),
        }
    }

    pub fn fort_type(&self) -> FortType {
        match self {
            Self::Gym(_) => FortType::Gym,
            Self::Pokestop(_) => FortType::Pokestop,
        }
    }

    pub fn common(&self) -> &FortCommon {
        match self {
            Self::Gym(gym) => &gym.common,
            Self::Pokestop(stop) => &stop.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut FortCommon {
        match self {
            Self::Gym(gym) => &mut gym.common,
            Self::Pokestop(stop) => &mut stop.common,
        }
    }

    pub fn id(&self) -> &str {
        &self.common().id
    }

    pub fn is_deleted(&self) -> bool {
        self.common().deleted
    }

    pub fn lookup(&self) -> FortLookup {
        match self {
            Self::Gym(gym) => gym.lookup(),
            Self::Pokestop(stop) => stop.lookup(),
        }
    }

    pub fn webhook_view(&self) -> FortWebhook {
        self.common().webhook_view(self.fort_type())
    }

    pub fn as_gym_mut(&mut self) -> Option<&mut Gym> {
        match self {
            Self::Gym(gym) => Some(gym),
            Self::Pokestop(_) => None,
        }
    }

    pub fn as_pokestop_mut(&mut self) -> Option<&mut Pokestop> {
        match self {
            Self::Pokestop(stop) => Some(stop),
            Self::Gym(_) => None,
        }
    }
}

impl StoredRecord for FortRecord {
    fn record_id(&self) -> &str {
        self.id()
    }
}

impl StoredRecord for Station {
    fn record_id(&self) -> &str {
        &self.id
    }
}
