pub mod domain;
pub mod forms;
pub mod insight;
pub mod ports;
pub mod session;
pub mod storage;

pub use domain::{
    AuthGrant, DashboardStats, HealthLog, HealthLogEntry, MedicalReport, Mood, PainLevel,
    ReportType, SavedInsight, Session, SessionStatus, UserProfile, UserRole,
};
pub use insight::{Insight, InsightDisplay, StructuredInsight};
pub use ports::{
    AuthService, HealthLogService, InsightService, PortError, PortResult, ReportService,
    SessionStorage,
};
pub use session::{SessionStore, ViewAccess};
pub use storage::MemoryStorage;
