use netreach_model::ProbeFailure;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {status}: {output}")]
    Exit {
        program: String,
        status: String,
        output: String,
    },
}

impl ProbeError {
    pub fn to_failure(&self) -> ProbeFailure {
        match self {
            ProbeError::Launch { .. } => ProbeFailure::launch(self.to_string()),
            ProbeError::Exit { output, .. } if !output.trim().is_empty() => {
                ProbeFailure::exit(output.trim())
            }
            ProbeError::Exit { .. } => ProbeFailure::exit(self.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("hostname lookup failed: {0}")]
    Hostname(#[source] std::io::Error),
    #[error("hostname is not valid UTF-8")]
    NotUtf8,
    #[error("cannot resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{0} resolved to no addresses")]
    NoAddress(String),
}
