//! Cross-platform process spawning helpers.
//!
//! On Windows, spawning console binaries (ffmpeg, cjpeg, etc.) from a
//! windowless context can pop a console window for each invocation. This
//! module centralizes the creation flag needed to suppress that.

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Apply platform-specific flags to a tokio process command.
pub fn configure_command(cmd: &mut tokio::process::Command) {
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}
