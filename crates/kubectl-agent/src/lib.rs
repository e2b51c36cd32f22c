//! `kubectl-agent` drives the `kubectl` binary as the deployer's control plane.
//!
//! Each trait call becomes one `kubectl` subprocess:
//!
//! ```text
//! ControlPlane call        kubectl invocation
//! ─────────────────        ──────────────────
//! query                    --context C get KIND -A -o json [-l SEL]
//! version                  --context C version -o json
//! apply / delete           --context C apply|delete -f PATH -R -l SEL
//! apply_server_side        --context C apply -f PATH -R --server-side=true
//! delete_all               --context C delete KIND --all -A
//! render                   --context C apply -f PATH -R -l SEL -o json --dry-run=client
//! set_context              config use-context C
//! ```
//!
//! Deletes pass `--ignore-not-found=true`. Non-zero exits, spawn failures and
//! timeouts surface as `DeployerError::ControlPlaneUnavailable`. A binary
//! missing from `PATH` is `DeployerError::InvalidConfig`.

pub mod client;
pub mod error;

pub(crate) mod process;


pub use client::Kubectl;
pub use error::KubectlError;
