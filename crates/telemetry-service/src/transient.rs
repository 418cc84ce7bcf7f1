/// True if `path` looks like a build-cache temporary binary rather than a
/// stable install location. Checked before `Install` writes a unit that
/// would otherwise point at a path the next build sweeps away.
pub fn is_transient_exe_path(path: &str) -> bool {
    let normalized = path.trim().to_lowercase().replace('\\', "/");
    if normalized.is_empty() {
        return false;
    }

    // Go's `go build`/`go run` stage binaries under a path like
    // `/tmp/go-build123456/b001/exe/daemon`.
    if normalized.contains("/go-build") && normalized.contains("/exe/") {
        return true;
    }

    // Cargo's own build-cache output directories.
    if normalized.contains("/target/debug/build/") || normalized.contains("/target/release/build/") {
        return true;
    }

    let temp_dir = std::env::temp_dir().to_string_lossy().to_lowercase().replace('\\', "/");
    if !temp_dir.is_empty() && normalized.starts_with(&temp_dir) {
        return true;
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_go_build_exe_paths() {
        assert!(is_transient_exe_path("/tmp/go-build1234567/b001/exe/daemon"));
    }

    #[test]
    fn flags_cargo_build_script_paths() {
        assert!(is_transient_exe_path("/home/user/project/target/debug/build/foo-abc/out/daemon"));
    }

    #[test]
    fn ignores_case_and_backslashes() {
        assert!(is_transient_exe_path(r"C:\TMP\GO-BUILD1\B001\EXE\daemon.exe"));
    }

    #[test]
    fn allows_stable_install_paths() {
        assert!(!is_transient_exe_path("/usr/local/bin/telemetryd"));
        assert!(!is_transient_exe_path("/home/user/.local/bin/telemetryd"));
    }
}
