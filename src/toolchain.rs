// SPDX-License-Identifier: Apache-2.0

//! Description of the external toolchain and the exact command lines the
//! pipelines run.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::annotations::AnnotationMarkers;
use crate::host_program::HostProgramLayout;
use crate::tools::ToolInvocation;
use crate::verdict::VerdictPhrases;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolchainConfig {
    /// Compiler front-end that loads the transpiler plugin.
    pub host_compiler: String,
    pub transpile_opt_flag: String,
    /// Path to the transpiler plugin shared object.
    pub plugin_path: PathBuf,
    /// Literal the plugin prints on stdout when it produced IR.
    pub success_marker: String,
    /// Name of the IR file the plugin writes into its working directory.
    pub transpiled_ir_name: String,
    /// Also strip target-triple lines from the transpiler's IR.
    pub normalize_transpiler_ir: bool,

    pub reference_compiler: String,
    /// Deliberately lower than `transpile_opt_flag` so the two IR files come
    /// from different code generation strategies.
    pub reference_opt_flag: String,
    pub reference_ir_name: String,
    pub target_triple_marker: String,

    /// The bidirectional IR equivalence prover, e.g. alive-tv.
    pub prover: String,
    pub prover_bidirectional_flag: String,
    pub verdict: VerdictPhrases,

    pub annotations: AnnotationMarkers,
    pub host_program: HostProgramLayout,
    pub host_program_name: String,
    /// Compiler used to link the host program against the transpiled IR.
    pub link_compiler: String,
    pub language_standard: String,
    pub assert_include_dir: PathBuf,
    pub assert_lib_dir: PathBuf,
    pub assert_lib: String,
    pub debug_info_flag: String,
    pub binary_name: String,
    /// Variable the dynamic loader consults for the assertion library.
    pub loader_path_var: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            host_compiler: "g++".to_string(),
            transpile_opt_flag: "-O3".to_string(),
            plugin_path: PathBuf::from("./libplugin.so"),
            success_marker: "TRANSPILED SUCCESSFULLY".to_string(),
            transpiled_ir_name: "x.ll".to_string(),
            normalize_transpiler_ir: false,

            reference_compiler: "clang++-17".to_string(),
            reference_opt_flag: "-Og".to_string(),
            reference_ir_name: "y.ll".to_string(),
            target_triple_marker: "target triple = ".to_string(),

            prover: "alive-tv".to_string(),
            prover_bidirectional_flag: "--bidirectional".to_string(),
            verdict: VerdictPhrases::default(),

            annotations: AnnotationMarkers::default(),
            host_program: HostProgramLayout::default(),
            host_program_name: "main.cpp".to_string(),
            link_compiler: "clang++-17".to_string(),
            language_standard: "-std=c++17".to_string(),
            assert_include_dir: PathBuf::from("_deps/assert-src/include"),
            assert_lib_dir: PathBuf::from("_deps/assert-build/"),
            assert_lib: "assert".to_string(),
            debug_info_flag: "-g".to_string(),
            binary_name: "a.out".to_string(),
            loader_path_var: "LD_LIBRARY_PATH".to_string(),
        }
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Bare program names (`g++`) are left for `PATH` lookup; anything with a
/// directory component is resolved like a file path.
fn absolutize_program(base: &Path, program: &str) -> String {
    let path = Path::new(program);
    if path.is_absolute() || path.components().count() <= 1 {
        program.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}

impl ToolchainConfig {
    /// Every test case runs in its own scratch directory, so relative paths
    /// in the config are pinned to `base` (the directory the harness was
    /// started from) up front.
    pub fn resolved_against(mut self, base: &Path) -> Self {
        self.plugin_path = absolutize(base, &self.plugin_path);
        self.assert_include_dir = absolutize(base, &self.assert_include_dir);
        self.assert_lib_dir = absolutize(base, &self.assert_lib_dir);
        self.host_compiler = absolutize_program(base, &self.host_compiler);
        self.reference_compiler = absolutize_program(base, &self.reference_compiler);
        self.prover = absolutize_program(base, &self.prover);
        self.link_compiler = absolutize_program(base, &self.link_compiler);
        self
    }

    /// Programs the harness needs on the host, in pipeline order.
    pub fn required_programs(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("host compiler", self.host_compiler.as_str()),
            ("reference compiler", self.reference_compiler.as_str()),
            ("prover", self.prover.as_str()),
            ("link compiler", self.link_compiler.as_str()),
        ]
    }

    /// `g++ -O3 <source> -fplugin=<plugin>`, run inside `work_dir` so the IR
    /// side-effect file lands there.
    pub fn transpile_invocation(&self, source: &Path, work_dir: &Path) -> ToolInvocation {
        let mut plugin_flag = std::ffi::OsString::from("-fplugin=");
        plugin_flag.push(&self.plugin_path);
        ToolInvocation::new("transpile", &self.host_compiler)
            .arg(&self.transpile_opt_flag)
            .arg(source)
            .arg(plugin_flag)
            .current_dir(work_dir)
    }

    pub fn reference_compile_invocation(
        &self,
        source: &Path,
        output_ir: &Path,
        work_dir: &Path,
    ) -> ToolInvocation {
        ToolInvocation::new("reference compile", &self.reference_compiler)
            .arg(source)
            .arg(&self.reference_opt_flag)
            .arg("-S")
            .arg("-emit-llvm")
            .arg("-o")
            .arg(output_ir)
            .current_dir(work_dir)
    }

    /// Transpiler IR first, reference IR second.
    pub fn prove_invocation(
        &self,
        transpiled_ir: &Path,
        reference_ir: &Path,
        work_dir: &Path,
    ) -> ToolInvocation {
        ToolInvocation::new("prove", &self.prover)
            .arg(&self.prover_bidirectional_flag)
            .arg(transpiled_ir)
            .arg(reference_ir)
            .current_dir(work_dir)
    }

    pub fn link_invocation(
        &self,
        host_program: &Path,
        transpiled_ir: &Path,
        binary: &Path,
        work_dir: &Path,
    ) -> ToolInvocation {
        let mut include_flag = std::ffi::OsString::from("-I");
        include_flag.push(&self.assert_include_dir);
        let mut lib_dir_flag = std::ffi::OsString::from("-L");
        lib_dir_flag.push(&self.assert_lib_dir);
        ToolInvocation::new("link", &self.link_compiler)
            .arg(host_program)
            .arg(&self.language_standard)
            .arg(transpiled_ir)
            .arg(include_flag)
            .arg(lib_dir_flag)
            .arg(format!("-l{}", self.assert_lib))
            .arg(&self.debug_info_flag)
            .arg("-o")
            .arg(binary)
            .current_dir(work_dir)
    }

    /// Runs the produced binary with the assertion library directory put in
    /// front of any existing loader search path.
    pub fn execute_invocation(&self, binary: &Path, work_dir: &Path) -> ToolInvocation {
        let mut search_path = vec![self.assert_lib_dir.clone()];
        if let Some(existing) = std::env::var_os(&self.loader_path_var) {
            search_path.extend(std::env::split_paths(&existing));
        }
        let joined = std::env::join_paths(&search_path)
            .unwrap_or_else(|_| self.assert_lib_dir.clone().into_os_string());
        ToolInvocation::new("execute", binary)
            .env(&self.loader_path_var, joined)
            .current_dir(work_dir)
    }
}
