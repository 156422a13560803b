use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc,
        Mutex,
    },
    time::Duration,
};

use tokio::task::JoinHandle;

use crate::persistence;

const INSTRUCTIONS_FILE: &str = "ai_instructions.json";

/// Keystroke-rate writes coalesce for this long before hitting disk.
const FLUSH_DELAY: Duration = Duration::from_millis(500);

/// note type -> field name -> instruction text, as persisted.
type InstructionMap = HashMap<String, HashMap<String, String>>;

/// Free-text AI instructions keyed by (note type, field name). Reads come
/// straight from memory; each `set` schedules a debounced flush keyed by the
/// composite identity, so editing one field doesn't reset another field's
/// pending write.
#[derive(Clone)]
pub struct InstructionStore {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    path: PathBuf,
    instructions: InstructionMap,
    timers: HashMap<(String, String), JoinHandle<()>>,
}

impl InstructionStore {
    pub fn load() -> Self {
        Self::at(persistence::get_data_file_path(INSTRUCTIONS_FILE))
    }

    pub fn at(path: PathBuf) -> Self {
        let instructions = persistence::read_json_file(&path).unwrap_or_else(|e| {
            eprintln!("Failed to load AI instructions: {}. Starting empty.", e);
            InstructionMap::default()
        });

        Self {
            inner: Arc::new(Mutex::new(Inner { path, instructions, timers: HashMap::new() })),
        }
    }

    pub fn get(&self, note_type: &str, field: &str) -> Option<String> {
        let inner = self.inner.lock().unwrap();
        inner.instructions.get(note_type).and_then(|fields| fields.get(field)).cloned()
    }

    pub fn all_for(&self, note_type: &str) -> HashMap<String, String> {
        self.inner.lock().unwrap().instructions.get(note_type).cloned().unwrap_or_default()
    }

    /// Updates memory immediately; the disk write happens after the debounce
    /// window, and a newer `set` for the same key supersedes the pending one.
    pub fn set(&self, note_type: &str, field: &str, instruction: &str) {
        let key = (note_type.to_string(), field.to_string());
        let mut inner = self.inner.lock().unwrap();

        inner
            .instructions
            .entry(note_type.to_string())
            .or_default()
            .insert(field.to_string(), instruction.to_string());

        if let Some(pending) = inner.timers.remove(&key) {
            pending.abort();
        }

        let store = self.inner.clone();
        let timer_key = key.clone();
        let deadline = tokio::time::Instant::now() + FLUSH_DELAY;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            Inner::write_out(&store, Some(&timer_key));
        });
        inner.timers.insert(key, handle);
    }

    /// Forces every pending write out now.
    pub fn flush(&self) {
        Inner::write_out(&self.inner, None);
    }
}

impl Inner {
    fn write_out(store: &Arc<Mutex<Inner>>, completed: Option<&(String, String)>) {
        let mut inner = store.lock().unwrap();

        match completed {
            Some(key) => {
                inner.timers.remove(key);
            }
            None => {
                for (_, pending) in inner.timers.drain() {
                    pending.abort();
                }
            }
        }

        if let Err(e) = persistence::write_json_file(&inner.path, &inner.instructions) {
            eprintln!("Failed to save AI instructions: {}", e);
        }
    }
}
