//! Build descriptor (Dockerfile) materialization.

use serde::Serialize;

use crate::domain::Workload;
use crate::infrastructure::config::EnvInjection;

/// Fixed launcher every workload is started with.
pub const LAUNCHER: [&str; 3] = ["dumb-init", "node", "."];

/// `.dockerignore` written next to every generated Dockerfile.
pub const DOCKERIGNORE: &str = "node_modules\nnpm-debug.log\n";

/// Lockfile whose presence selects the reproducible install.
pub const LOCKFILE: &str = "package-lock.json";

/// Dependency install command chosen from the extracted sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStep {
    /// `npm ci`, pinned by the lockfile.
    Reproducible,
    /// `npm install`, resolving versions at build time.
    BestEffort,
}

impl InstallStep {
    #[must_use]
    pub const fn for_lockfile(present: bool) -> Self {
        if present {
            Self::Reproducible
        } else {
            Self::BestEffort
        }
    }

    #[must_use]
    pub const fn command(self) -> &'static str {
        match self {
            Self::Reproducible => "npm ci --omit=dev",
            Self::BestEffort => "npm install --omit=dev",
        }
    }
}

/// Logical fields of the generated Dockerfile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildDescriptor {
    pub runtime_version: String,
    /// Unprivileged OS user inside the image; the tenant handle.
    pub username: String,
    /// Directory under the user's home the sources are copied to.
    pub workdir: String,
    pub install: InstallStep,
    pub entrypoint: Vec<String>,
}

impl BuildDescriptor {
    #[must_use]
    pub fn new(workload: &Workload, install: InstallStep, injection: EnvInjection) -> Self {
        let mut entrypoint = Vec::with_capacity(workload.environment.len() + LAUNCHER.len());
        if injection == EnvInjection::Entrypoint {
            entrypoint.extend(workload.environment.iter().map(|var| var.assignment()));
        }
        entrypoint.extend(LAUNCHER.iter().map(|s| (*s).to_string()));

        Self {
            runtime_version: workload.runtime_version.to_string(),
            username: workload.tenant.to_string(),
            workdir: workload.name.stem().to_string(),
            install,
            entrypoint,
        }
    }

    /// Exec-form `CMD` argument: the JSON argv with single quotes removed.
    #[must_use]
    pub fn cmd(&self) -> String {
        serde_json::to_string(&self.entrypoint)
            .unwrap_or_else(|_| "[]".to_string())
            .replace('\'', "")
    }

    /// Render the Dockerfile text.
    #[must_use]
    pub fn render(&self) -> String {
        let user = &self.username;
        format!(
            "FROM node:{version}-bookworm-slim\n\
             RUN groupadd --gid 420 {user} && useradd --uid 10420 --gid {user} --shell /bin/bash --create-home {user}\n\
             RUN apt-get update && apt-get install -y --no-install-recommends dumb-init\n\
             WORKDIR /home/{user}/{workdir}\n\
             COPY --chown={user}:{user} package*.json ./\n\
             RUN {install}\n\
             COPY --chown={user}:{user} . .\n\
             USER {user}\n\
             CMD {cmd}",
            version = self.runtime_version,
            workdir = self.workdir,
            install = self.install.command(),
            cmd = self.cmd(),
        )
    }
}
