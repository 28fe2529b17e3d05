use flume::Receiver;
use helpers::buffer::RingBuffer;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{debug, warn};

pub const OFFLINE_COMMENTARY: &str = "System offline.";
pub const EMPTY_COMMENTARY: &str = "Excitement all over the track!";
pub const GENERIC_CONTEXT: &str = "generic";

/// FlavorRequest is emitted by the race and consumed by the flavor worker. The race never waits
/// for an answer.
#[derive(Debug, Clone, PartialEq)]
pub enum FlavorRequest {
    Commentary {
        lap: u32,
        leader: String,
        condition: Option<String>,
    },
    Illustration {
        key: String,
        context: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Illustration {
    pub key: String,
    pub uri: String,
}

#[derive(Debug, Error)]
pub enum FlavorError {
    #[error("flavor provider failed: {0}")]
    Provider(String),
}

/// FlavorProvider generates commentary lines and event illustrations, e.g. by calling a remote
/// content generation service.
pub trait FlavorProvider: Send {
    /// is_configured returns false if the provider has no backend to talk to.
    fn is_configured(&self) -> bool {
        true
    }

    fn commentary(
        &mut self,
        lap: u32,
        leader: &str,
        condition: Option<&str>,
    ) -> Result<String, FlavorError>;

    fn illustration(&mut self, key: &str, context: &str)
        -> Result<Option<Illustration>, FlavorError>;
}

/// OfflineFlavor is used when no content provider is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFlavor;

impl FlavorProvider for OfflineFlavor {
    fn is_configured(&self) -> bool {
        false
    }

    fn commentary(&mut self, _: u32, _: &str, _: Option<&str>) -> Result<String, FlavorError> {
        Ok(OFFLINE_COMMENTARY.to_owned())
    }

    fn illustration(&mut self, _: &str, _: &str) -> Result<Option<Illustration>, FlavorError> {
        Ok(None)
    }
}

/// TemplateFlavor composes commentary from local templates and maps illustrations to bundled
/// asset files.
#[derive(Debug)]
pub struct TemplateFlavor {
    asset_dir: String,
    rng: StdRng,
}

const TEMPLATES_GREEN: [&str; 4] = [
    "Lap {lap}: {leader} controls the pace at the front.",
    "Lap {lap}: {leader} leads, the chasing pack is lining up.",
    "Lap {lap}: fastest sector for {leader}!",
    "Lap {lap}: {leader} is managing the gap.",
];

const TEMPLATES_CONDITION: [&str; 3] = [
    "Lap {lap}: {condition}! {leader} has to stay calm.",
    "Lap {lap}: {condition} shakes things up, {leader} still ahead.",
    "Lap {lap}: {condition} and {leader} is feeling the pressure.",
];

impl TemplateFlavor {
    pub fn new(asset_dir: &str) -> TemplateFlavor {
        TemplateFlavor {
            asset_dir: asset_dir.trim_end_matches('/').to_owned(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(asset_dir: &str, seed: u64) -> TemplateFlavor {
        TemplateFlavor {
            asset_dir: asset_dir.trim_end_matches('/').to_owned(),
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl FlavorProvider for TemplateFlavor {
    fn commentary(
        &mut self,
        lap: u32,
        leader: &str,
        condition: Option<&str>,
    ) -> Result<String, FlavorError> {
        let templates: &[&str] = match condition {
            Some(_) => &TEMPLATES_CONDITION,
            None => &TEMPLATES_GREEN,
        };
        let template = templates
            .choose(&mut self.rng)
            .ok_or_else(|| FlavorError::Provider("no commentary templates".to_owned()))?;

        Ok(template
            .replace("{lap}", &lap.to_string())
            .replace("{leader}", leader)
            .replace("{condition}", condition.unwrap_or_default()))
    }

    fn illustration(
        &mut self,
        key: &str,
        _context: &str,
    ) -> Result<Option<Illustration>, FlavorError> {
        Ok(Some(Illustration {
            key: key.to_owned(),
            uri: format!("{}/{}.png", self.asset_dir, key),
        }))
    }
}

/// FlavorDisplay is the display-only slot the flavor worker writes into. The simulation never
/// reads it.
#[derive(Debug, Clone, Default)]
pub struct FlavorDisplay {
    pub commentary: RingBuffer<String>,
    pub illustration: Option<Illustration>,
}

pub type SharedFlavorDisplay = Arc<Mutex<FlavorDisplay>>;

pub fn new_shared_display() -> SharedFlavorDisplay {
    Arc::new(Mutex::new(FlavorDisplay::default()))
}

/// FlavorService answers flavor requests and degrades to static fallbacks. Illustrations are
/// cached per key.
pub struct FlavorService {
    provider: Box<dyn FlavorProvider>,
    illustration_cache: HashMap<String, Illustration>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlavorAnswer {
    Commentary(String),
    Illustration(Option<Illustration>),
}

impl FlavorService {
    pub fn new(provider: Box<dyn FlavorProvider>) -> FlavorService {
        FlavorService {
            provider,
            illustration_cache: HashMap::new(),
        }
    }

    pub fn answer(&mut self, request: &FlavorRequest) -> FlavorAnswer {
        match request {
            FlavorRequest::Commentary {
                lap,
                leader,
                condition,
            } => FlavorAnswer::Commentary(self.commentary(*lap, leader, condition.as_deref())),
            FlavorRequest::Illustration { key, context } => {
                FlavorAnswer::Illustration(self.illustration(key, context))
            }
        }
    }

    fn commentary(&mut self, lap: u32, leader: &str, condition: Option<&str>) -> String {
        if !self.provider.is_configured() {
            return OFFLINE_COMMENTARY.to_owned();
        }

        match self.provider.commentary(lap, leader, condition) {
            Ok(text) if text.trim().is_empty() => EMPTY_COMMENTARY.to_owned(),
            Ok(text) => text.trim().to_owned(),
            Err(e) => {
                warn!("commentary unavailable: {}", e);
                format!("Lap {}: race underway.", lap)
            }
        }
    }

    fn illustration(&mut self, key: &str, context: &str) -> Option<Illustration> {
        if !self.provider.is_configured() {
            return None;
        }
        if let Some(cached) = self.illustration_cache.get(key) {
            return Some(cached.to_owned());
        }

        match self.provider.illustration(key, context) {
            Ok(Some(illustration)) => {
                self.illustration_cache
                    .insert(key.to_owned(), illustration.to_owned());
                Some(illustration)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("illustration {} unavailable: {}", key, e);
                None
            }
        }
    }
}

/// spawn_flavor_worker answers flavor requests on a separate thread until all senders are
/// dropped. Answers are written into the shared display slot.
pub fn spawn_flavor_worker(
    provider: Box<dyn FlavorProvider>,
    rx: Receiver<FlavorRequest>,
    display: SharedFlavorDisplay,
) -> JoinHandle<()> {
    thread::spawn(move || {
        let mut service = FlavorService::new(provider);

        for request in rx.iter() {
            debug!("flavor request {:?}", request);
            let answer = service.answer(&request);

            let mut display = match display.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            match answer {
                FlavorAnswer::Commentary(text) => display.commentary.push(text),
                FlavorAnswer::Illustration(illustration) => display.illustration = illustration,
            }
        }
    })
}
