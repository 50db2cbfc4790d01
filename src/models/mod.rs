//! Database rows and request bodies.

pub mod audit;
pub mod catalog;
pub mod quote;
pub mod requests;

#[cfg(test)]
pub mod fixtures;

pub use audit::AuditLog;
pub use catalog::{
    ApplicationModule, IntegrationType, MatureIntegration, PricingRule, PricingVersion, Referrer,
    SaasProduct, SkuDefinition, TextSnippet, TravelZone,
};
pub use quote::{Quote, QuoteSaasLine, QuoteSetupLine, QuoteVersion, QuoteVersionDetail};
