//! SurrealDB repository implementations.

mod appointment;
mod consultorio;
mod package;
mod staff;

pub use appointment::SurrealAppointmentRepository;
pub use consultorio::SurrealConsultorioRepository;
pub use package::SurrealPackageRepository;
pub use staff::SurrealStaffRepository;
