// SPDX-License-Identifier: Apache-2.0

//! Fake toolchain for end-to-end tests of the harness driver.
//!
//! The fake tools are small POSIX shell scripts that behave like the real
//! ones closely enough for the harness to classify results. Test source files
//! steer them with markers:
//!
//! - `FAKE: unsupported` makes the transpiler decline the file;
//! - `FAKE: miscompile` makes the transpiler emit IR the prover rejects;
//! - `FAKE: reference-error` makes reference compilation fail;
//! - a `false` anywhere in the synthesized host program makes the linked
//!   binary exit non-zero;
//! - `LINK_ERROR` anywhere in the host program makes linking fail.
//!
//! Like the real compilers, the fake transpiler and clang fail with a
//! "No such file" style message when handed a source path that does not
//! exist relative to their working directory.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

const FAKE_TRANSPILER: &str = r#"#!/bin/sh
src="$2"
if [ ! -f "$src" ]; then
  echo "g++: error: $src: No such file or directory" >&2
  exit 1
fi
if grep -q "FAKE: unsupported" "$src"; then
  echo "sorry, unimplemented: fake" >&2
  exit 1
fi
if grep -q "FAKE: miscompile" "$src"; then
  body="ret i32 1"
else
  body="ret i32 0"
fi
printf 'define i32 @f() {\n  %s\n}\n' "$body" > x.ll
echo "TRANSPILED SUCCESSFULLY"
echo "undefined reference to 'main'" >&2
exit 1
"#;

const FAKE_CLANG: &str = r#"#!/bin/sh
first="$1"
out=""
emit=0
prev=""
for a in "$@"; do
  if [ "$prev" = "-o" ]; then out="$a"; fi
  if [ "$a" = "-emit-llvm" ]; then emit=1; fi
  prev="$a"
done
if [ ! -f "$first" ]; then
  echo "clang++: error: no such file or directory: '$first'" >&2
  exit 1
fi
if [ "$emit" = 1 ]; then
  if grep -q "FAKE: reference-error" "$first"; then
    echo "error: fake reference failure" >&2
    exit 1
  fi
  printf 'target triple = "x86_64-pc-linux-gnu"\ndefine i32 @f() {\n  ret i32 0\n}\n' > "$out"
  exit 0
fi
if grep -q "LINK_ERROR" "$first"; then
  echo "main.cpp: error: use of undeclared identifier 'LINK_ERROR'" >&2
  exit 1
fi
if grep -q "false" "$first"; then status=1; else status=0; fi
printf '#!/bin/sh\necho "ran assertions"\nexit %s\n' "$status" > "$out"
chmod +x "$out"
"#;

const FAKE_PROVER: &str = r#"#!/bin/sh
x="$2"
y="$3"
if grep -q "target triple" "$y"; then
  echo "ERROR: Could not translate '$y'"
  exit 1
fi
if cmp -s "$x" "$y"; then
  echo "Transformation seems to be correct!"
  exit 0
fi
echo "Transformation doesn't verify!"
exit 1
"#;

fn write_executable(path: &Path, contents: &str) {
    std::fs::write(path, contents).expect("write fake tool");
    let mut permissions = std::fs::metadata(path)
        .expect("stat fake tool")
        .permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions).expect("chmod fake tool");
}

/// A directory holding the fake tools and an (empty) plugin file.
pub struct FakeToolchain {
    dir: tempfile::TempDir,
}

impl FakeToolchain {
    pub fn new() -> Self {
        let dir = make_test_tmpdir("bimple_tv_fake_toolchain");
        write_executable(&dir.path().join("fake-g++"), FAKE_TRANSPILER);
        write_executable(&dir.path().join("fake-clang++"), FAKE_CLANG);
        write_executable(&dir.path().join("fake-alive-tv"), FAKE_PROVER);
        std::fs::write(dir.path().join("libplugin.so"), "").expect("write fake plugin");
        std::fs::create_dir_all(dir.path().join("_deps/assert-build")).expect("mkdir deps");
        log::info!("fake toolchain in {}", dir.path().display());
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A `[toolchain]` table pointing every tool at its fake.
    pub fn toolchain_table(&self) -> String {
        let tool = |name: &str| self.dir.path().join(name).display().to_string();
        format!(
            "[toolchain]\n\
             host_compiler = {:?}\n\
             plugin_path = {:?}\n\
             reference_compiler = {:?}\n\
             prover = {:?}\n\
             link_compiler = {:?}\n\
             assert_lib_dir = {:?}\n",
            tool("fake-g++"),
            tool("libplugin.so"),
            tool("fake-clang++"),
            tool("fake-alive-tv"),
            tool("fake-clang++"),
            tool("_deps/assert-build"),
        )
    }

    /// Writes a toolchain file at `path` with the fake `[toolchain]` table
    /// followed by `extra` (e.g. a `[harness]` table).
    pub fn write_toml(&self, path: &Path, extra: &str) -> PathBuf {
        let text = format!("{}\n{}", self.toolchain_table(), extra);
        std::fs::write(path, text).expect("write toolchain toml");
        path.to_path_buf()
    }
}

impl Default for FakeToolchain {
    fn default() -> Self {
        Self::new()
    }
}

/// Populates `alive-tests/` and `output-tests/` under `root`.
pub fn write_test_tree(root: &Path, equivalence: &[(&str, &str)], behavioral: &[(&str, &str)]) {
    for (dir, files) in [("alive-tests", equivalence), ("output-tests", behavioral)] {
        let dir = root.join(dir);
        std::fs::create_dir_all(&dir).expect("mkdir suite root");
        for (name, contents) in files {
            std::fs::write(dir.join(name), contents).expect("write test file");
        }
    }
}

/// Creates a unique temporary directory for tests under the system temp dir,
/// using the provided base prefix combined with the process id.
///
/// The directory is cleaned up automatically when the returned `TempDir` is
/// dropped.
pub fn make_test_tmpdir(base_prefix: &str) -> tempfile::TempDir {
    let prefix = format!("{}_{}_", base_prefix, std::process::id());
    tempfile::Builder::new()
        .prefix(&prefix)
        .tempdir_in(std::env::temp_dir())
        .expect("tempdir create")
}
