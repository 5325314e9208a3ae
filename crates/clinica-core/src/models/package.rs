//! Package domain model.
//!
//! A package is a subscription tier: numeric limits plus boolean
//! feature flags. Packages are shared read-only reference entities,
//! not owned by any consultorio.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric limits per consultorio. `None` means unlimited.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct PackageLimits {
    pub doctors: Option<u32>,
    pub receptionists: Option<u32>,
    pub consultorios: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct PackageFeatures {
    pub document_upload: bool,
    pub image_upload: bool,
    pub advanced_reports: bool,
    pub integrations: bool,
    pub priority_support: bool,
}

/// A gated feature, named by its wire key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Feature {
    DocumentUpload,
    ImageUpload,
    AdvancedReports,
    Integrations,
    PrioritySupport,
}

impl Feature {
    /// Resolve a wire key to a known feature. Unknown keys return
    /// `None` so callers can distinguish a typo from a disabled flag.
    pub fn parse(name: &str) -> Option<Feature> {
        match name {
            "document_upload" => Some(Feature::DocumentUpload),
            "image_upload" => Some(Feature::ImageUpload),
            "advanced_reports" => Some(Feature::AdvancedReports),
            "integrations" => Some(Feature::Integrations),
            "priority_support" => Some(Feature::PrioritySupport),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Feature::DocumentUpload => "document_upload",
            Feature::ImageUpload => "image_upload",
            Feature::AdvancedReports => "advanced_reports",
            Feature::Integrations => "integrations",
            Feature::PrioritySupport => "priority_support",
        }
    }
}

impl PackageFeatures {
    pub fn flag(&self, feature: Feature) -> bool {
        match feature {
            Feature::DocumentUpload => self.document_upload,
            Feature::ImageUpload => self.image_upload,
            Feature::AdvancedReports => self.advanced_reports,
            Feature::Integrations => self.integrations,
            Feature::PrioritySupport => self.priority_support,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    /// Unique slug consultorios reference (e.g. `basico`).
    pub name: String,
    /// Human-readable name shown in entitlement messages.
    pub display_name: String,
    pub limits: PackageLimits,
    pub features: PackageFeatures,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePackage {
    pub name: String,
    pub display_name: String,
    pub limits: PackageLimits,
    pub features: PackageFeatures,
}
