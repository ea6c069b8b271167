// Synthetic Identity Generation
//
// Every job gets a fresh user id with a time-sortable unique suffix. Track
// calls additionally get a made-up person: a random capitalised name, an email
// derived from the user id and a five digit CRM id.

use rand::{rngs::StdRng, Rng, SeedableRng};
use uuid::Uuid;

use crate::models::{EventKind, Profile, SyntheticEvent};

const UPPER_LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const NAME_LENGTH: usize = 8;

/// Produces synthetic identities for load test jobs
#[derive(Debug, Clone)]
pub struct IdentityGenerator {
    user_id_prefix: String,
    email_domain: String,
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new("use_", "segment-x.com")
    }
}

impl IdentityGenerator {
    pub fn new(user_id_prefix: impl Into<String>, email_domain: impl Into<String>) -> Self {
        Self {
            user_id_prefix: user_id_prefix.into(),
            email_domain: email_domain.into(),
        }
    }

    /// Prefix plus a UUIDv7, whose leading timestamp keeps ids sortable by creation time
    pub fn user_id(&self) -> String {
        format!("{}{}", self.user_id_prefix, Uuid::now_v7().simple())
    }

    /// Generate the identity for one job using a fresh entropy-seeded RNG
    pub fn generate(&self, kind: EventKind) -> SyntheticEvent {
        let mut rng = StdRng::from_entropy();
        self.generate_with_rng(kind, &mut rng)
    }

    pub fn generate_with_rng<R: Rng + ?Sized>(&self, kind: EventKind, rng: &mut R) -> SyntheticEvent {
        let user_id = self.user_id();
        match kind {
            EventKind::Identify => SyntheticEvent::Identify { user_id },
            EventKind::Track => {
                let profile = self.profile_for(&user_id, rng);
                SyntheticEvent::Track { user_id, profile }
            }
        }
    }

    pub fn profile_for<R: Rng + ?Sized>(&self, user_id: &str, rng: &mut R) -> Profile {
        let (first_name, last_name) = random_name(rng);
        Profile {
            first_name,
            last_name,
            email: format!("{}@{}", user_id, self.email_domain),
            crm_id: random_crm_id(rng),
        }
    }
}

/// Two eight letter names, each capitalised, letters picked uniformly
pub fn random_name<R: Rng + ?Sized>(rng: &mut R) -> (String, String) {
    (random_capitalised_word(rng), random_capitalised_word(rng))
}

fn random_capitalised_word<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..NAME_LENGTH)
        .map(|i| {
            let charset = if i == 0 { UPPER_LETTERS } else { LOWER_LETTERS };
            charset[rng.gen_range(0..charset.len())] as char
        })
        .collect()
}

/// Five digit id in [10000, 99998]
pub fn random_crm_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    rng.gen_range(10_000..99_999u32).to_string()
}
