use anyhow::Result;
use camino::Utf8PathBuf;
use std::{env::current_dir, sync::LazyLock};

use assert_cmd::{Command, cargo};

static TEST_PREFIX: LazyLock<Utf8PathBuf> = LazyLock::new(|| {
    let current_dir = current_dir().expect("Cannot figure out current directory");

    let file_path = current_dir
        .join("tests")
        .join("integration")
        .join("test-data");

    if !file_path.exists() {
        panic!("Cannot find test data directory: {}", file_path.display());
    }

    Utf8PathBuf::try_from(file_path).expect("Cannot create UTF-8 path from test data directory")
});

pub fn input_under_test(name: &str) -> String {
    let file_path = TEST_PREFIX.join(name);

    if !file_path.exists() {
        panic!("Cannot find input under test: {file_path}");
    }

    file_path.to_string()
}

pub enum OutputMode {
    Stdout,
    #[allow(dead_code, reason = "currently not used by any integration test")]
    Stderr,
    Both,
}

pub struct ImageQualifier {
    cmd: Command,
    rules: Option<String>,
    images: Vec<String>,
    output: OutputMode,
    expects_failure: bool,
}

impl ImageQualifier {
    /// Create a new imagequalifier runner.
    pub fn new() -> Self {
        let mut cmd = Command::new(cargo::cargo_bin!());

        // Our child process starts with a clean environment, so that
        // things like `RUST_LOG` and `IMAGEQUALIFIER_DEFAULT_DOMAIN`
        // are only ever set explicitly.
        cmd.env_clear();

        Self {
            cmd,
            rules: None,
            images: vec![],
            output: OutputMode::Stdout,
            expects_failure: false,
        }
    }

    pub fn args<'a>(mut self, args: impl IntoIterator<Item = &'a str>) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn setenv(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = Some(rules.into());
        self
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.images.push(image.into());
        self
    }

    pub fn output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn expects_failure(mut self, flag: bool) -> Self {
        if flag {
            self = self.output(OutputMode::Both);
        }
        self.expects_failure = flag;
        self
    }

    pub fn run(mut self) -> Result<String> {
        if let Some(rules) = &self.rules {
            self.cmd.arg(rules);
        }

        for image in &self.images {
            self.cmd.arg(image);
        }

        let output = self.cmd.output()?;

        let mut raw = String::from_utf8(match self.output {
            OutputMode::Stdout => output.stdout,
            OutputMode::Stderr => output.stderr,
            OutputMode::Both => [output.stderr, output.stdout].concat(),
        })?;

        if let Some(exit_code) = output.status.code() {
            // 1/2 are general errors, 101 is Rust's panic exit code.
            let is_failure = matches!(exit_code, 1 | 2 | 101);
            if is_failure != self.expects_failure {
                anyhow::bail!("imagequalifier exited with unexpected code {exit_code}: {raw}");
            }
        }

        let rules_placeholder = "@@RULES@@";
        if let Some(rules) = &self.rules {
            raw = raw.replace(rules, rules_placeholder);
        }

        // Fallback: replace any lingering absolute paths.
        let test_prefix_placeholder = "@@TEST_PREFIX@@";
        raw = raw.replace(TEST_PREFIX.as_str(), test_prefix_placeholder);

        let version_placeholder = "@@VERSION@@";
        raw = raw.replace(env!("CARGO_PKG_VERSION"), version_placeholder);

        Ok(raw)
    }
}

pub fn imagequalifier() -> ImageQualifier {
    ImageQualifier::new()
}
