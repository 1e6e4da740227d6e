//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements    | Connects to                        |
//! |----------------|---------------|------------------------------------|
//! | `file_store`   | ChannelStore  | JSON documents in a shared dir     |
//! | `memory_store` | ChannelStore  | In-process map (tests, simulation) |
//! | `serial`       | SerialLink    | `serialport` handle                |
//! | `sun`          | DaylightPort  | NOAA solar position approximation  |
//! | `time`         | Clock         | Host wall clock / manual clock     |
//! | `log_sink`     | EventSink     | `log` facade via `env_logger`      |

pub(crate) mod entry;
pub mod file_store;
pub mod log_sink;
pub mod memory_store;
pub mod serial;
pub mod sun;
pub mod time;
