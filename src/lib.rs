//! Shastho Registration Library
//!
//! This library provides the core of the Shastho healthcare portal: phone
//! sign-in, role-based account registration, and the directory of doctors,
//! hospitals, diagnostic centers and blood banks, all persisted as JSON in a
//! key-value store.
//!
//! # Features
//! - Four-step sign-in funnel (phone, verification code, role, profile)
//! - Role-specific profiles for patients, doctors, diagnostic centers and blood banks
//! - In-memory and file-backed stores
//! - Directory search, appointments and prescriptions
//!
//! # Modules
//! - `session`: Sign-in and registration state machine
//! - `db`: Key-value storage and typed JSON helpers
//! - `models`: Users, profiles, registration forms and directory records
//! - `directory`: List and search queries
//! - `phone`: Phone number validation and formatting
//! - `config`: Configuration management
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use shastho_registration::{
//!     db::MemoryStore,
//!     models::{PatientForm, RegistrationForm, Role},
//!     session::AuthSession,
//! };
//!
//! async fn register() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut session = AuthSession::new(Arc::new(MemoryStore::new()));
//!     session.submit_phone("01712345678").await?;
//!     session.verify_otp("123456").await?;
//!     session.select_role(Role::Patient).await?;
//!     session
//!         .complete_registration(RegistrationForm::Patient(PatientForm {
//!             name: "Karim".into(),
//!             age: Some(30),
//!             gender: "male".into(),
//!             blood_group: "B+".into(),
//!             ..Default::default()
//!         }))
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Copyright
//! Copyright (c) 2025 Shastho
//! All rights reserved.
//!
//! # License
//! Licensed under the AGPLv3 license.

pub mod config;
pub mod db;
pub mod directory;
pub mod models;
pub mod phone;
pub mod session;
