//! Shared constants.

/// Default HTTP port for `depot serve`.
pub const DEFAULT_PORT: u16 = 3000;

/// Default bind host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default prefix under which the download routes are nested.
pub const DEFAULT_ROUTE_PREFIX: &str = "/apis";

/// Default download sub-folder below the static root.
pub const DEFAULT_DOWNLOAD_FOLDER: &str = "downloads";

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "depot.toml";

/// Read window used when a range request omits its end offset (1 MiB).
pub const RANGE_WINDOW_SIZE: u64 = 1024 * 1024;

/// Size of a single chunk read from disk and handed to the sink (64 KiB).
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Number of chunks the HTTP sink buffers before the pump is suspended.
pub const SINK_CAPACITY: usize = 4;

/// Fallback MIME type for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Default header carrying the authenticated user id.
pub const DEFAULT_USER_HEADER: &str = "x-user-id";

/// Default number of records printed by `depot records`.
pub const DEFAULT_RECORD_LIMIT: usize = 20;
