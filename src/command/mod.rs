//! Command-line assembly for the iTest runtime.
//!
//! [`CommandLine`] is an ordered list of typed flag/value pairs that is rendered
//! once; all quoting happens in [`CommandLine::render`]. [`CommandBuilder`] fills
//! it from a [`RunRequest`], the [`GlobalSettings`] and the [`BuildContext`].

use std::fmt;

use crate::config::{GlobalSettings, RunRequest};
use crate::core::context::BuildContext;

pub mod path;

pub const FLAG_LICENSE_SERVER: &str = "--licenseServer";
pub const FLAG_ITAR: &str = "--itar";
pub const FLAG_EXPORT_ITAR: &str = "--exportItar";
pub const FLAG_TEST: &str = "--test";
pub const FLAG_TESTBED: &str = "--testbed";
pub const FLAG_PARAM: &str = "--param";
pub const FLAG_PARAM_FILE: &str = "--paramfile";
pub const FLAG_REPORT: &str = "--report";
pub const FLAG_DB_USER: &str = "--trdb.user";
pub const FLAG_DB_PASSWORD: &str = "--trdb.password";
pub const FLAG_TAG: &str = "--tag";
pub const FLAG_HOST: &str = "--host";
pub const FLAG_URI: &str = "--uri";
pub const FLAG_CATALOG: &str = "--catalog";
pub const FLAG_DB_TYPE: &str = "--dbtype";
pub const FLAG_IP_ADDR: &str = "--ipaddr";
pub const FLAG_DB_PORT: &str = "--trdb.port";

/// Placeholder the runtime replaces with each test case's file name.
pub const REPORT_FILE_PLACEHOLDER: &str = "{tcfilename}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    /// Always wrapped in double quotes.
    Quoted(String),
    /// Written as-is unless it contains whitespace or quotes.
    Bare(String),
    /// Flag without a value.
    Switch,
}

/// An executable followed by ordered flag/value pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<(&'static str, Value)>,
}

impl CommandLine {
    /// Start a command line for `program`, which is written verbatim.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append `flag "value"`.
    pub fn quoted(&mut self, flag: &'static str, value: impl Into<String>) -> &mut Self {
        self.args.push((flag, Value::Quoted(value.into())));
        self
    }

    /// Append `flag value`, quoting the value only when it needs it.
    pub fn bare(&mut self, flag: &'static str, value: impl Into<String>) -> &mut Self {
        self.args.push((flag, Value::Bare(value.into())));
        self
    }

    /// Append a flag that takes no value.
    pub fn switch(&mut self, flag: &'static str) -> &mut Self {
        self.args.push((flag, Value::Switch));
        self
    }

    /// Flags in order of appearance.
    pub fn flags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.args.iter().map(|(flag, _)| *flag)
    }

    /// Values passed to `flag`, in order.
    pub fn values_of<'a>(&'a self, flag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.args
            .iter()
            .filter(move |(f, _)| *f == flag)
            .filter_map(|(_, value)| match value {
                Value::Quoted(v) | Value::Bare(v) => Some(v.as_str()),
                Value::Switch => None,
            })
    }

    /// Whether `flag` appears at least once.
    pub fn contains(&self, flag: &str) -> bool {
        self.args.iter().any(|(f, _)| *f == flag)
    }

    /// Render the command line as a single string.
    ///
    /// Backslash separators in the program and in every value become forward
    /// slashes before quoting, so the only backslashes left are quote escapes.
    pub fn render(&self) -> String {
        let mut out = to_forward_slashes(&self.program);
        for (flag, value) in &self.args {
            out.push(' ');
            out.push_str(flag);
            match value {
                Value::Quoted(v) => {
                    out.push(' ');
                    out.push_str(&quote(&to_forward_slashes(v)));
                }
                Value::Bare(v) if needs_quotes(v) => {
                    out.push(' ');
                    out.push_str(&quote(&to_forward_slashes(v)));
                }
                Value::Bare(v) => {
                    out.push(' ');
                    out.push_str(&to_forward_slashes(v));
                }
                Value::Switch => {}
            }
        }
        out
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn to_forward_slashes(value: &str) -> String {
    value.replace('\\', "/")
}

fn needs_quotes(value: &str) -> bool {
    value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '"')
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// A command line together with the test cases it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledCommand {
    pub command_line: CommandLine,
    /// Test case names (file name without extension), used for report files.
    pub test_case_names: Vec<String>,
    /// Unescaped test case URIs, parallel to `test_case_names`.
    pub test_case_uris: Vec<String>,
}

impl AssembledCommand {
    /// Render the command line as a single string.
    pub fn render(&self) -> String {
        self.command_line.render()
    }
}

/// Builds the runtime command line for one run.
pub struct CommandBuilder<'a> {
    request: &'a RunRequest,
    settings: &'a GlobalSettings,
    ctx: &'a BuildContext,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(request: &'a RunRequest, settings: &'a GlobalSettings, ctx: &'a BuildContext) -> Self {
        Self {
            request,
            settings,
            ctx,
        }
    }

    /// Assemble the full command line.
    ///
    /// Report and database flags are included only when the request asks for reports.
    pub fn assemble(&self) -> AssembledCommand {
        let root = self.ctx.workspace_str();
        let escape = self.ctx.shell.space_escape();
        let mut cmd = CommandLine::new(self.settings.runner.executable());

        match self.settings.license_server.address() {
            Some(address) => {
                cmd.bare(FLAG_LICENSE_SERVER, address);
            }
            None => log::warn!("no license server configured, omitting {FLAG_LICENSE_SERVER}"),
        }

        cmd.quoted(FLAG_ITAR, path::resolve_workspace(&self.request.workspace, &root));

        let mut test_case_names = Vec::new();
        let mut test_case_uris = Vec::new();
        for raw in &self.request.test_cases {
            let uri = path::resolve_test_case(raw, &root);
            if uri.is_empty() {
                continue;
            }
            cmd.quoted(FLAG_TEST, path::escape_spaces(&uri, escape));
            test_case_names.push(path::test_case_name(&uri));
            test_case_uris.push(uri);
        }

        self.add_execution_options(&mut cmd, &root, escape);

        if self.request.report {
            self.add_report_options(&mut cmd);
            self.add_database_options(&mut cmd);
        }

        AssembledCommand {
            command_line: cmd,
            test_case_names,
            test_case_uris,
        }
    }

    /// Command line that exports the workspace projects as an iTAR archive.
    pub fn export_itar(&self) -> CommandLine {
        let root = self.ctx.workspace_str();
        let mut cmd = CommandLine::new(self.settings.runner.executable());
        cmd.quoted(FLAG_ITAR, path::resolve_workspace(&self.request.workspace, &root))
            .switch(FLAG_EXPORT_ITAR);
        cmd
    }

    fn add_execution_options(&self, cmd: &mut CommandLine, root: &str, escape: &str) {
        let testbed = path::resolve(&self.request.testbed, root, escape);
        if !testbed.is_empty() {
            cmd.quoted(FLAG_TESTBED, testbed);
        }

        for param in &self.request.parameters {
            let param = param.trim();
            if !param.is_empty() {
                cmd.quoted(FLAG_PARAM, param);
            }
        }

        let param_file = path::resolve(&self.request.param_file, root, escape);
        if !param_file.is_empty() {
            cmd.quoted(FLAG_PARAM_FILE, param_file);
        }
    }

    fn add_report_options(&self, cmd: &mut CommandLine) {
        let target = format!(
            "{}{}/{}.html",
            path::workspace_uri(&self.ctx.workspace_str(), self.ctx.shell.space_escape()),
            self.ctx.report_dir_name(),
            REPORT_FILE_PLACEHOLDER
        );
        cmd.bare(FLAG_REPORT, target);
    }

    fn add_database_options(&self, cmd: &mut CommandLine) {
        let Some(db) = self.settings.database.as_ref() else {
            return;
        };
        if db.username.is_empty() {
            return;
        }

        cmd.bare(FLAG_DB_USER, db.username.as_str());
        cmd.bare(FLAG_DB_PASSWORD, db.password.as_str());

        if !self.request.database_tag.is_empty() {
            cmd.bare(FLAG_TAG, self.request.database_tag.as_str());
        }

        let host = self.settings.license_server.host.trim();
        if !host.is_empty() {
            cmd.bare(FLAG_HOST, host);
        }

        if !db.uri.is_empty() {
            cmd.bare(FLAG_URI, db.uri.as_str());
            return;
        }

        cmd.bare(FLAG_CATALOG, db.name.as_str());
        cmd.bare(
            FLAG_DB_TYPE,
            db.db_type.map(|t| t.to_string()).unwrap_or_default(),
        );
        cmd.bare(FLAG_IP_ADDR, db.host.as_str());
        cmd.bare(FLAG_DB_PORT, db.port.as_str());
    }
}
