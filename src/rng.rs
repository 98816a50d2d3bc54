//! Single seeded random source shared by every generator and distribution.
//!
//! Replaces the source's singleton RNG with an explicit `SimRng` resource:
//! every sampling call in the crate takes `&mut SimRng` so a fixed seed
//! fully determines a run.

use bevy_ecs::prelude::Resource;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Resource)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn new(seed: Option<u64>) -> Self {
        let inner = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::seed_from_u64(0),
        };
        Self(inner)
    }
}

impl std::ops::Deref for SimRng {
    type Target = StdRng;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for SimRng {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
