//! Session state: the single owner of everything a takeoff front end shows.

mod state;

pub use state::{
    ErrorKind, ExtractionTicket, InteractionMode, PageImage, Session, SessionConfig,
    SessionError, DEFAULT_PAGE_LOAD_TIMEOUT, DEFAULT_RENDER_ZOOM, DISPLAY_SCALE_STEP,
    MAX_DISPLAY_SCALE, MIN_DISPLAY_SCALE,
};
