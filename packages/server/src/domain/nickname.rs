//! Display-name generation.

use std::sync::{Mutex, PoisonError};

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

const ADJECTIVES: &[&str] = &[
    "agile", "amber", "bold", "brave", "breezy", "bright", "calm", "clever", "cosmic", "crimson",
    "curious", "dapper", "daring", "dizzy", "eager", "fancy", "fearless", "fluffy", "frosty",
    "gentle", "giddy", "golden", "happy", "hasty", "humble", "jolly", "keen", "lively", "lucky",
    "mellow", "mighty", "misty", "nimble", "noble", "patient", "plucky", "polite", "proud",
    "quiet", "quirky", "rapid", "rusty", "shiny", "silent", "silly", "sleepy", "snappy", "sneaky",
    "spicy", "sunny", "swift", "tidy", "tiny", "velvet", "vivid", "wandering", "witty", "zesty",
];

const ANIMALS: &[&str] = &[
    "albatross", "alpaca", "badger", "beaver", "bison", "capybara", "cheetah", "cobra", "condor",
    "coyote", "crane", "dingo", "dolphin", "eagle", "falcon", "ferret", "finch", "gecko", "gibbon",
    "heron", "hedgehog", "ibis", "iguana", "jackal", "jaguar", "koala", "lemur", "llama", "lynx",
    "marmot", "meerkat", "mongoose", "moose", "narwhal", "ocelot", "otter", "owl", "panda",
    "pelican", "penguin", "puffin", "quokka", "raccoon", "raven", "salamander", "seal", "sloth",
    "sparrow", "squid", "tapir", "toucan", "turtle", "walrus", "weasel", "wombat", "yak", "zebra",
];

/// Source of candidate display names.
///
/// Rooms resolve collisions themselves, so candidates need not be unique.
pub trait NicknameSource: Send + Sync {
    fn generate(&self) -> String;
}

/// Two random words, each Title-cased, joined together (`BraveOtter`)
#[derive(Debug)]
pub struct RandomNicknames<R = StdRng> {
    rng: Mutex<R>,
}

impl RandomNicknames<StdRng> {
    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence of names for a given seed
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng + Send> RandomNicknames<R> {
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl<R: Rng + Send> NicknameSource for RandomNicknames<R> {
    fn generate(&self) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let adjective = ADJECTIVES.choose(&mut *rng).copied().unwrap_or("anonymous");
        let animal = ANIMALS.choose(&mut *rng).copied().unwrap_or("visitor");
        format!("{}{}", title_case(adjective), title_case(animal))
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
