//! WinterBoard Core Library
//!
//! Platform-agnostic engine for the WinterBoard collaborative whiteboard:
//! document model, input handling, gestures, history, and realtime sync.

pub mod board;
pub mod camera;
pub mod collaboration;
pub mod component;
pub mod gestures;
pub mod history;
pub mod input;
pub mod layer;
pub mod offline;
pub mod palm;
pub mod selection;
pub mod storage;
pub mod sync;
pub mod tools;

pub use board::{BoardEngine, BoardError, BoardOperation, BoardSnapshot, OperationKind, Page};
pub use camera::Viewport;
pub use collaboration::{CollabEvent, CollaborationClient, CursorState, PresenceUser};
pub use component::{Component, ComponentData, ComponentManager, ComponentPatch, ComponentSpec};
pub use gestures::{GestureEvent, GestureRecognizer};
pub use history::{HistoryManager, MAX_UNDO_ENTRIES};
pub use input::{InputDisposition, InputRouter, PointerInput, PointerKind, PointerPhase};
pub use layer::{Layer, LayerManager};
pub use offline::OfflineQueue;
pub use palm::{PalmFilter, PalmRejectionMode, RejectReason};
pub use selection::SelectionManager;
pub use storage::{MemoryStorage, SettingsStore, Storage};
pub use sync::{ConnectionState, SyncChannel, SyncConfig, SyncEvent, Transport};
pub use tools::{ToolConfig, ToolKind, ToolManager};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
#[cfg(not(target_arch = "wasm32"))]
pub use sync::NativeWebSocket;
