//! Host/device dual-resident arrays for nodyn simulations.
//!
//! "Device" memory is a flat buffer processed by a data-parallel work pool:
//! one task per element, no ordering between elements within a pass, and
//! every pass returns only after all elements completed.
//!
//! ```text
//! DualArray<T>
//! ├── host: Vec<T>           (authored sequentially, append-friendly)
//! └── device: DeviceArray<T> (whole-array reassigned by sync())
//! ```
//!
//! Synchronization is explicit and non-incremental: [`DualArray::sync`]
//! reallocates the device buffer at the host length. Nothing copies on
//! access.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array2d;
pub mod device;
pub mod dual;
pub mod error;
pub mod list;

pub use array2d::DeviceArray2D;
pub use device::DeviceArray;
pub use dual::DualArray;
pub use error::{check_len, ArrayError};
pub use list::DeviceArrayList;
