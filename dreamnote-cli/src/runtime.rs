//! Editor-side files shipped inside the binary.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Result;

const GINIT_VIM: &str = include_str!("../runtime/ginit.vim");
const BRIDGE_LUA: &str = include_str!("../runtime/lua/dreamnote/bridge.lua");

/// Lua module the editor loads at startup.
pub const BRIDGE_MODULE: &str = "dreamnote.bridge";
/// Environment variable carrying the socket path to the editor.
pub const BRIDGE_ENV: &str = "DREAMNOTE_BRIDGE";

/// Writes the runtime files under `runtime_dir/runtime` and returns that directory.
///
/// Existing files are overwritten so the editor always runs the version that
/// matches this binary.
pub fn install(runtime_dir: &Path) -> Result<PathBuf> {
    let root = runtime_dir.join("runtime");
    let lua_dir = root.join("lua").join("dreamnote");
    fs::create_dir_all(&lua_dir)?;
    fs::write(root.join("ginit.vim"), GINIT_VIM)?;
    fs::write(lua_dir.join("bridge.lua"), BRIDGE_LUA)?;
    debug!("editor runtime installed in {}", root.display());
    Ok(root)
}

/// Arguments that make the editor load the bridge before reading any file.
pub fn startup_args(runtime_root: &Path) -> Vec<String> {
    vec![
        "--cmd".to_string(),
        format!("set rtp^={}", runtime_root.display()),
        "--cmd".to_string(),
        format!("lua require('{BRIDGE_MODULE}').connect()"),
    ]
}
