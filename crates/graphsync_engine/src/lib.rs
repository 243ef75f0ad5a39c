//! Graphsync engine: durable state, remote client, and the resumable pipelines.
mod account;
mod api;
mod executor;
mod ledger;
mod lookup;
mod oauth;
mod paginate;
mod persist;
mod pipeline;
mod settings;
mod store;
mod twitter;
mod wire;

pub use account::{
    AccountContext, Credentials, CredentialsError, CREDENTIALS_FILENAME, LOG_FILENAME,
    SETTINGS_FILENAME,
};
pub use api::{ApiError, Cursor, GraphApi, Mutation, RemoteError};
pub use executor::{ExecuteError, ExecutionReport, Executor};
pub use ledger::{AppendLog, FsAppendLog, MemoryAppendLog};
pub use lookup::{BatchLookup, RELATIONSHIPS};
pub use oauth::RequestSigner;
pub use paginate::{
    stored_identifiers, FollowingCollection, Harvest, PageRecord, PagedCollection, PaginateError,
    Paginator, SearchCollection, FOLLOWING, SEARCH,
};
pub use persist::{ensure_storage_dir, AtomicFileWriter, PersistError};
pub use pipeline::{Pipeline, PipelineError, RunSummary, REJECTS, WHITELIST};
pub use settings::{SettingsError, SyncSettings};
pub use store::{FsPageStore, MemoryPageStore, PageKey, PageStore};
pub use twitter::TwitterClient;
pub use wire::{decode_following, decode_relationships, decode_search, DecodedPage};
