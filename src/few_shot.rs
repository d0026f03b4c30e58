//! Few-shot example pool for prompt grounding.
//!
//! The pool is a plain-text file of question/query pairs:
//!
//! ```text
//! ###
//! How many orders were placed last month?
//! ---
//! SELECT COUNT(*) FROM orders WHERE ...;
//! ###
//! ...
//! ```
//!
//! Blocks are separated by `###`; each block splits at the first `---`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{InquireError, Result};

/// Separator between example blocks.
pub const BLOCK_DELIMITER: &str = "###";

/// Separator between the question and the query inside a block.
pub const PAIR_DELIMITER: &str = "---";

/// A question with the SQL that answers it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamplePair {
    pub question: String,
    pub query: String,
}

impl ExamplePair {
    /// Creates a new example pair.
    pub fn new(question: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            query: query.into(),
        }
    }
}

/// A parsed, immutable pool of example pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamplePool {
    examples: Vec<ExamplePair>,
}

impl ExamplePool {
    /// Creates a pool from already parsed pairs.
    pub fn new(examples: Vec<ExamplePair>) -> Self {
        Self { examples }
    }

    /// Parses a pool from its text form.
    ///
    /// Empty blocks are skipped. A non-empty block without a `---` separator
    /// is a configuration error.
    pub fn parse(text: &str) -> Result<Self> {
        let examples = text
            .trim()
            .split(BLOCK_DELIMITER)
            .map(str::trim)
            .filter(|block| !block.is_empty())
            .enumerate()
            .map(|(index, block)| {
                let (question, query) = block.split_once(PAIR_DELIMITER).ok_or_else(|| {
                    InquireError::config(format!(
                        "example block {} has no '{}' separator",
                        index + 1,
                        PAIR_DELIMITER
                    ))
                })?;
                Ok(ExamplePair::new(question.trim(), query.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { examples })
    }

    /// Reads and parses a pool file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            InquireError::config(format!(
                "Failed to read examples file {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&text)
    }

    /// Returns all examples in file order.
    pub fn examples(&self) -> &[ExamplePair] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Picks up to `count` examples using `sampler`.
    ///
    /// When the pool holds `count` or fewer examples, all of them are returned.
    pub fn select(&self, count: usize, sampler: &dyn ExampleSampler) -> Vec<ExamplePair> {
        if self.examples.len() <= count {
            return self.examples.clone();
        }
        sampler.sample(&self.examples, count)
    }
}

/// Strategy for choosing which examples go into a prompt.
pub trait ExampleSampler: Send + Sync {
    /// Returns exactly `count` distinct examples from `pool`.
    ///
    /// Only called when `pool.len() > count`.
    fn sample(&self, pool: &[ExamplePair], count: usize) -> Vec<ExamplePair>;
}

/// Uniform sampling without replacement.
pub struct RandomSampler {
    rng: Mutex<StdRng>,
}

impl RandomSampler {
    /// Creates a sampler seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Creates a reproducible sampler.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl ExampleSampler for RandomSampler {
    fn sample(&self, pool: &[ExamplePair], count: usize) -> Vec<ExamplePair> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pool.choose_multiple(&mut *rng, count).cloned().collect()
    }
}

/// Deterministic sampler that takes the first `count` examples.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstSampler;

impl ExampleSampler for FirstSampler {
    fn sample(&self, pool: &[ExamplePair], count: usize) -> Vec<ExamplePair> {
        pool.iter().take(count).cloned().collect()
    }
}

/// Appends a known-good pair to the pool file, creating it if needed.
pub fn append_example(path: &Path, question: &str, query: &str) -> Result<()> {
    let question = question.trim();
    let query = query.trim();
    if question.is_empty() || query.is_empty() {
        return Err(InquireError::config(
            "Both a question and a SQL query are required to save an example",
        ));
    }
    if [question, query]
        .iter()
        .any(|text| text.contains(BLOCK_DELIMITER) || text.contains(PAIR_DELIMITER))
    {
        return Err(InquireError::config(format!(
            "Examples must not contain '{BLOCK_DELIMITER}' or '{PAIR_DELIMITER}'"
        )));
    }

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                InquireError::config(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| InquireError::config(format!("Failed to open {}: {e}", path.display())))?;

    write!(
        file,
        "\n{BLOCK_DELIMITER}\n{question}\n{PAIR_DELIMITER}\n{query}\n"
    )
    .map_err(|e| InquireError::config(format!("Failed to write {}: {e}", path.display())))?;

    Ok(())
}
