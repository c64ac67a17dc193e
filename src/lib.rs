// Copyright 2025 ModerRAS (Rust implementation)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Structural Takeoff
//!
//! Core of an interactive quantity-takeoff tool for structural drawings.
//!
//! A user views a rasterized PDF page, calibrates the drawing scale, drags
//! rectangles over regions of interest and has a backend read the
//! annotations inside them. Per-region results are merged into running
//! totals of elevations, stud counts and steel-profile values.
//!
//! Three coordinate spaces are kept apart at the type level:
//! [`ImagePixel`] (the raster), [`Document`] (PDF points) and
//! [`RealWorld`] (calibrated units).
//!
//! ## Example
//!
//! ```rust,no_run
//! use structural_takeoff::{Point, Session, SessionConfig, TakeoffClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = TakeoffClient::with_defaults()?;
//!     let mut session = Session::new(SessionConfig::default());
//!
//!     session.open_document(std::fs::read("plan.pdf")?)?;
//!     session.load_page(&backend, 0).await?;
//!
//!     session.pointer_down(Point::new(100.0, 40.0));
//!     session.pointer_move(Point::new(300.0, 140.0));
//!     session.pointer_up();
//!     session.extract_pending(&backend).await?;
//!
//!     println!("Studs: {}", session.results().studs_total);
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod calibration;
pub mod client;
pub mod notice;
pub mod selection;
pub mod session;
pub mod settings;
pub mod transform;

pub use aggregate::{AggregateResults, ExtractionResult, ProfileValue, ResultAggregator};
pub use calibration::{
    Axis, CalibrationEngine, CalibrationError, CalibrationMode, CalibrationPhase,
    CalibrationState, ScaleFactor, ScalePreset, COMMON_SCALES,
};
pub use client::{BackendConfig, ClientError, DrawingBackend, TakeoffClient};
pub use notice::{Notice, Severity};
pub use selection::{
    Selection, SelectionError, SelectionHistory, SelectionId, SelectionState,
    SelectionStateMachine,
};
pub use session::{ErrorKind, InteractionMode, PageImage, Session, SessionConfig, SessionError};
pub use settings::{AppSettings, SettingsError};
pub use transform::{Document, ImagePixel, PageUnit, Point, RealWorld, Rect};
