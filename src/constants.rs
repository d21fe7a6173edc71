// src/constants.rs

use std::time::Duration;

/// Current version written into every `*.args.json` file and solution state blob.
pub const FILE_VERSION: u32 = 2;

/// Suffix of the per-project JSON file (`<project>.args.json`).
pub const PROJECT_FILE_SUFFIX: &str = ".args.json";

/// Extension used for the solution-wide JSON file (`<solution>.args.json`).
pub const SOLUTION_FILE_EXTENSION: &str = "args.json";

/// Extension of the solution-level settings file (`<solution>.ArgsCfg.json`).
pub const SOLUTION_SETTINGS_EXTENSION: &str = "ArgsCfg.json";

/// Project property that redirects the project JSON file to a custom location.
pub const JSON_FILE_PROPERTY: &str = "SmartCmdArgJsonFile";

/// Project property holding the build output directory.
pub const TARGET_DIR_PROPERTY: &str = "TargetDir";

/// Directory name under the user config dir (`~/.config/smartargs`).
pub const CONFIG_DIR_NAME: &str = "smartargs";

/// File name of the global options inside the config dir.
pub const OPTIONS_FILENAME: &str = "options.toml";

/// Number of snapshots kept by the undo history.
pub const HISTORY_CAPACITY: usize = 500;

/// Quiet window of the per-project debounced notifications.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);

/// Settle window before a startup project change is confirmed.
pub const STARTUP_SETTLE_DELAY: Duration = Duration::from_millis(250);

/// Delimiter used by containers unless configured otherwise.
pub const DEFAULT_DELIMITER: &str = " ";
