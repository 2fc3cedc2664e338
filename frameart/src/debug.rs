//! Diagnostic command registry
//!
//! The commands form a static table ([`COMMANDS`]) so the dispatcher is data
//! driven. Each command keeps its own in-flight status and last result.
//!
//! Concurrent dispatches of the same command with the same argument share a
//! single request. A dispatch with a different argument supersedes the one in
//! flight: the older settlement still reaches its caller but is not recorded.
//! A dispatch whose callers are all dropped is abandoned and leaves the
//! command idle.

use crate::client::FrameArtClient;
use crate::error::{Error, Result};
use crate::models::ArtMode;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Remote-control key codes accepted by `send-key`
pub const REMOTE_KEYS: &[&str] = &[
    "KEY_POWER",
    "KEY_POWEROFF",
    "KEY_HOME",
    "KEY_MENU",
    "KEY_BACK",
    "KEY_UP",
    "KEY_DOWN",
    "KEY_LEFT",
    "KEY_RIGHT",
    "KEY_ENTER",
    "KEY_VOLUP",
    "KEY_VOLDOWN",
    "KEY_MUTE",
    "KEY_CHUP",
    "KEY_CHDOWN",
    "KEY_SOURCE",
    "KEY_HDMI",
    "KEY_NETFLIX",
    "KEY_AMAZON",
];

/// Art Mode positions accepted by `set-artmode`
pub const ART_MODES: &[&str] = &["on", "off"];

// ============================================================================
// Command identifiers
// ============================================================================

/// Identifier of a registered debug command
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandId {
    ApiVersion,
    TvStatus,
    AvailableArt,
    ArtmodeSettings,
    SlideshowStatus,
    DeviceInfo,
    AppList,
    PowerOn,
    SendKey,
    SetArtmode,
    RunApp,
    TestUpload,
}

impl CommandId {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandId::ApiVersion => "api-version",
            CommandId::TvStatus => "tv-status",
            CommandId::AvailableArt => "available-art",
            CommandId::ArtmodeSettings => "artmode-settings",
            CommandId::SlideshowStatus => "slideshow-status",
            CommandId::DeviceInfo => "device-info",
            CommandId::AppList => "app-list",
            CommandId::PowerOn => "power-on",
            CommandId::SendKey => "send-key",
            CommandId::SetArtmode => "set-artmode",
            CommandId::RunApp => "run-app",
            CommandId::TestUpload => "test-upload",
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommandId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        COMMANDS
            .iter()
            .map(|spec| spec.id)
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::UnknownCommand(s.to_string()))
    }
}

// ============================================================================
// Argument shapes
// ============================================================================

/// Shape of the single optional argument of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArgSpec {
    /// Parameterless
    None,
    /// One of a fixed set of values
    OneOf {
        label: &'static str,
        choices: &'static [&'static str],
    },
    /// Any non-blank text
    Text { label: &'static str },
}

impl ArgSpec {
    /// Check an argument against this shape, returning it trimmed
    pub fn validate(&self, arg: Option<&str>) -> Result<Option<String>> {
        let arg = arg.map(str::trim).filter(|a| !a.is_empty());

        match (self, arg) {
            (ArgSpec::None, None) => Ok(None),
            (ArgSpec::None, Some(arg)) => Err(Error::validation(format!(
                "Unexpected argument '{arg}'"
            ))),
            (ArgSpec::OneOf { label, .. } | ArgSpec::Text { label }, None) => {
                Err(Error::validation(format!("Missing {label}")))
            }
            (ArgSpec::OneOf { label, choices }, Some(arg)) => {
                if choices.iter().any(|choice| *choice == arg) {
                    Ok(Some(arg.to_string()))
                } else {
                    Err(Error::validation(format!(
                        "Invalid {label} '{arg}', expected one of: {}",
                        choices.join(", ")
                    )))
                }
            }
            (ArgSpec::Text { .. }, Some(arg)) => Ok(Some(arg.to_string())),
        }
    }

    pub fn takes_argument(&self) -> bool {
        !matches!(self, ArgSpec::None)
    }
}

// ============================================================================
// Command table
// ============================================================================

/// Future returned by a command invocation
pub type CommandFuture = BoxFuture<'static, Result<Value>>;

/// Invocation of a command with its validated argument
pub type Invoke = fn(FrameArtClient, Option<String>) -> CommandFuture;

/// Static description of a debug command
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommandSpec {
    pub id: CommandId,
    pub title: &'static str,
    pub description: &'static str,
    pub arg: ArgSpec,
    #[serde(skip)]
    pub invoke: Invoke,
}

macro_rules! invoker {
    ($name:ident, |$client:ident| $call:expr) => {
        fn $name(client: FrameArtClient, _arg: Option<String>) -> CommandFuture {
            async move {
                let $client = client;
                $call.await
            }
            .boxed()
        }
    };
    ($name:ident, |$client:ident, $arg:ident| $call:expr) => {
        fn $name(client: FrameArtClient, arg: Option<String>) -> CommandFuture {
            async move {
                let $client = client;
                let $arg = arg.unwrap_or_default();
                $call.await
            }
            .boxed()
        }
    };
}

invoker!(invoke_api_version, |client| client.debug_api_version());
invoker!(invoke_tv_status, |client| client.debug_tv_status());
invoker!(invoke_available_art, |client| client.debug_available_art());
invoker!(invoke_artmode_settings, |client| client.debug_artmode_settings());
invoker!(invoke_slideshow_status, |client| client.debug_slideshow_status());
invoker!(invoke_device_info, |client| client.debug_device_info());
invoker!(invoke_app_list, |client| client.debug_app_list());
invoker!(invoke_power_on, |client| client.debug_power_on());
invoker!(invoke_send_key, |client, key| client.debug_send_key(&key));
invoker!(invoke_set_artmode, |client, mode| client
    .debug_set_artmode(mode.parse::<ArtMode>()?));
invoker!(invoke_run_app, |client, app_id| client.debug_run_app(&app_id));
invoker!(invoke_test_upload, |client, filename| client
    .debug_test_upload(&filename));

/// Every registered debug command
pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        id: CommandId::ApiVersion,
        title: "API version",
        description: "Samsung API version reported by the TV (legacy < 4.0.0.0)",
        arg: ArgSpec::None,
        invoke: invoke_api_version,
    },
    CommandSpec {
        id: CommandId::TvStatus,
        title: "Full TV status",
        description: "Power, Art Mode support and state, current art, device info",
        arg: ArgSpec::None,
        invoke: invoke_tv_status,
    },
    CommandSpec {
        id: CommandId::AvailableArt,
        title: "Available art",
        description: "Every image stored on the TV",
        arg: ArgSpec::None,
        invoke: invoke_available_art,
    },
    CommandSpec {
        id: CommandId::ArtmodeSettings,
        title: "Art Mode settings",
        description: "Art Mode settings (brightness, colour temperature, ...)",
        arg: ArgSpec::None,
        invoke: invoke_artmode_settings,
    },
    CommandSpec {
        id: CommandId::SlideshowStatus,
        title: "Slideshow status",
        description: "Slideshow status through the legacy and current APIs",
        arg: ArgSpec::None,
        invoke: invoke_slideshow_status,
    },
    CommandSpec {
        id: CommandId::DeviceInfo,
        title: "Device info",
        description: "Detailed information about the TV",
        arg: ArgSpec::None,
        invoke: invoke_device_info,
    },
    CommandSpec {
        id: CommandId::AppList,
        title: "Application list",
        description: "Applications installed on the TV",
        arg: ArgSpec::None,
        invoke: invoke_app_list,
    },
    CommandSpec {
        id: CommandId::PowerOn,
        title: "Power on",
        description: "Send the power key",
        arg: ArgSpec::None,
        invoke: invoke_power_on,
    },
    CommandSpec {
        id: CommandId::SendKey,
        title: "Send key",
        description: "Send a remote-control key",
        arg: ArgSpec::OneOf {
            label: "key",
            choices: REMOTE_KEYS,
        },
        invoke: invoke_send_key,
    },
    CommandSpec {
        id: CommandId::SetArtmode,
        title: "Set Art Mode",
        description: "Switch Art Mode on or off",
        arg: ArgSpec::OneOf {
            label: "mode",
            choices: ART_MODES,
        },
        invoke: invoke_set_artmode,
    },
    CommandSpec {
        id: CommandId::RunApp,
        title: "Run application",
        description: "Launch an installed application by id",
        arg: ArgSpec::Text { label: "app id" },
        invoke: invoke_run_app,
    },
    CommandSpec {
        id: CommandId::TestUpload,
        title: "Test upload",
        description: "Upload a local file to the TV with detailed diagnostics",
        arg: ArgSpec::Text { label: "filename" },
        invoke: invoke_test_upload,
    },
];

/// Look up the static description of a command
///
/// [`COMMANDS`] is ordered like the [`CommandId`] variants.
pub fn spec(id: CommandId) -> &'static CommandSpec {
    &COMMANDS[id as usize]
}

// ============================================================================
// Results and status
// ============================================================================

/// Whether a command has a request in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandStatus {
    Idle,
    InFlight,
}

/// Settlement of the last recorded dispatch of a command
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DebugCommandResult {
    Success {
        #[serde(rename = "commandId")]
        command_id: CommandId,
        payload: Value,
    },
    Failure {
        #[serde(rename = "commandId")]
        command_id: CommandId,
        error: String,
    },
}

impl DebugCommandResult {
    fn settle(command_id: CommandId, outcome: &Result<Value>) -> Self {
        match outcome {
            Ok(payload) => Self::Success {
                command_id,
                payload: payload.clone(),
            },
            Err(err) => Self::Failure {
                command_id,
                error: failure_message(err),
            },
        }
    }

    pub fn command_id(&self) -> CommandId {
        match self {
            Self::Success { command_id, .. } | Self::Failure { command_id, .. } => *command_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Success { payload, .. } => Some(payload),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

/// Device and server errors are reported as their bare message
fn failure_message(err: &Error) -> String {
    match err {
        Error::Command(message) | Error::Validation(message) => message.clone(),
        Error::Server { detail, .. } => detail.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Registry
// ============================================================================

struct PendingDispatch {
    arg: Option<String>,
    generation: u64,
    waiters: usize,
    future: Shared<CommandFuture>,
}

#[derive(Default)]
struct CommandEntry {
    last_result: Option<DebugCommandResult>,
    generation: u64,
    pending: Option<PendingDispatch>,
}

type Entries = Arc<Mutex<HashMap<CommandId, CommandEntry>>>;

fn lock(entries: &Entries) -> MutexGuard<'_, HashMap<CommandId, CommandEntry>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Withdraws one caller from a pending dispatch when it goes away
///
/// The last caller to leave abandons the dispatch, so the command returns
/// to idle and the next dispatch issues a new request.
struct DispatchGuard {
    entries: Entries,
    id: CommandId,
    generation: u64,
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        let mut entries = lock(&self.entries);
        let Some(entry) = entries.get_mut(&self.id) else {
            return;
        };
        let Some(pending) = entry
            .pending
            .as_mut()
            .filter(|pending| pending.generation == self.generation)
        else {
            return;
        };
        pending.waiters -= 1;
        if pending.waiters == 0 {
            debug!(
                command = %self.id,
                generation = self.generation,
                "Debug command abandoned by its callers"
            );
            entry.pending = None;
        }
    }
}

/// Dispatcher over [`COMMANDS`] with per-command state
///
/// Commands never block each other. Clones share the same state.
#[derive(Clone)]
pub struct DebugCommandRegistry {
    client: FrameArtClient,
    entries: Entries,
}

impl fmt::Debug for DebugCommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebugCommandRegistry")
            .field("base_url", &self.client.base_url())
            .field("commands", &COMMANDS.len())
            .finish_non_exhaustive()
    }
}

impl DebugCommandRegistry {
    pub fn new(client: FrameArtClient) -> Self {
        Self {
            client,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The command table
    pub fn commands(&self) -> &'static [CommandSpec] {
        COMMANDS
    }

    pub fn spec(&self, id: CommandId) -> &'static CommandSpec {
        spec(id)
    }

    /// Dispatch a command by its textual id
    ///
    /// An unknown id fails with [`Error::UnknownCommand`] and records
    /// nothing.
    pub async fn dispatch_by_name(&self, id: &str, arg: Option<&str>) -> Result<Value> {
        let id: CommandId = id.parse()?;
        self.dispatch(id, arg).await
    }

    /// Run a command and record its settlement
    ///
    /// Argument validation failures are recorded as a failure result and
    /// returned without any network call. Dropping every caller of a
    /// dispatch before it settles abandons it without recording anything.
    pub async fn dispatch(&self, id: CommandId, arg: Option<&str>) -> Result<Value> {
        let spec = spec(id);

        let arg = match spec.arg.validate(arg) {
            Ok(arg) => arg,
            Err(err) => {
                warn!(command = %id, "Rejected debug command: {}", err);
                lock(&self.entries).entry(id).or_default().last_result =
                    Some(DebugCommandResult::settle(id, &Err(err.clone())));
                return Err(err);
            }
        };

        let (generation, future) = {
            let mut entries = lock(&self.entries);
            let entry = entries.entry(id).or_default();

            match entry.pending.as_mut().filter(|pending| pending.arg == arg) {
                Some(pending) => {
                    debug!(command = %id, "Joining in-flight debug command");
                    pending.waiters += 1;
                    (pending.generation, pending.future.clone())
                }
                None => {
                    if entry.pending.is_some() {
                        debug!(command = %id, ?arg, "Superseding in-flight debug command");
                    }
                    entry.generation += 1;
                    let future = (spec.invoke)(self.client.clone(), arg.clone()).shared();
                    entry.pending = Some(PendingDispatch {
                        arg: arg.clone(),
                        generation: entry.generation,
                        waiters: 1,
                        future: future.clone(),
                    });
                    debug!(command = %id, ?arg, "Dispatching debug command");
                    (entry.generation, future)
                }
            }
        };

        let _guard = DispatchGuard {
            entries: self.entries.clone(),
            id,
            generation,
        };
        let outcome = future.await;

        let mut entries = lock(&self.entries);
        let entry = entries.entry(id).or_default();
        match entry.pending.as_ref().map(|pending| pending.generation) {
            Some(current) if current == generation => {
                entry.pending = None;
                entry.last_result = Some(DebugCommandResult::settle(id, &outcome));
                match &outcome {
                    Ok(_) => info!(command = %id, "Debug command succeeded"),
                    Err(err) => warn!(command = %id, "Debug command failed: {}", err),
                }
            }
            Some(_) => {
                debug!(command = %id, generation, "Superseded debug command settled");
            }
            // Déjà enregistré par un appelant joint
            None => {}
        }

        outcome
    }

    /// Last recorded result of a command
    pub async fn result(&self, id: CommandId) -> Option<DebugCommandResult> {
        lock(&self.entries)
            .get(&id)
            .and_then(|entry| entry.last_result.clone())
    }

    /// Every recorded result, by command id
    pub async fn results(&self) -> BTreeMap<CommandId, DebugCommandResult> {
        lock(&self.entries)
            .iter()
            .filter_map(|(id, entry)| entry.last_result.clone().map(|result| (*id, result)))
            .collect()
    }

    pub async fn status(&self, id: CommandId) -> CommandStatus {
        match lock(&self.entries).get(&id) {
            Some(entry) if entry.pending.is_some() => CommandStatus::InFlight,
            _ => CommandStatus::Idle,
        }
    }

    pub async fn is_in_flight(&self, id: CommandId) -> bool {
        self.status(id).await == CommandStatus::InFlight
    }
}
