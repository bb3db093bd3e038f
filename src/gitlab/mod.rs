// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Namespace for the GitLab integration (transport, pacing, paginated client, project resolution)
// role: gitlab/namespace
// outputs: Public submodules; test doubles for the transport and clock seams
// invariants: Every network call goes through Transport; every pause goes through Clock
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

pub mod client;
pub mod rate_limit;
pub mod resolver;
pub mod transport;

pub use client::{ClientConfig, GitlabClient, MergeRequestFilter};
pub use rate_limit::{Clock, RetryPolicy, SystemClock};
pub use resolver::ProjectResolver;
pub use transport::{HttpTransport, Transport};
