// solana-greeter — client library for the greeter Solana program
// © 2024 by Composable Foundation
// © 2025 by Michał Nazarewicz <mina86@mina86.com>
//
// This program is free software; you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation; either version 2 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program; if not, see <https://www.gnu.org/licenses/>.

//! Client library for the greeter Solana program.
//!
//! The greeter program keeps a counter in a greeting account and reads its
//! instructions as a single selector byte.  Both the account contents and the
//! instruction data have a fixed binary layout which this crate describes with
//! the [`layout!`] macro ([`mod@layout`] module).  Getting that layout wrong
//! doesn’t necessarily make the program fail; it may just as well do the wrong
//! thing.
//!
//! Beyond the codec the crate provides instruction builders
//! ([`mod@instruction`]), transaction assembly and signing
//! ([`transaction`]), and submission with confirmation ([`gateway`]).
//! [`Client`] ties all of that together for the operations the greeter program
//! supports.
//!
//! ## Features
#![doc = document_features::document_features!()]

pub mod client;
#[cfg(feature = "rpc")]
pub mod config;
mod error;
#[cfg(test)]
mod fake;
pub mod gateway;
pub mod instruction;
pub mod layout;
pub mod state;
pub mod transaction;

pub use client::Client;
pub use error::Error;
pub use layout::Layout;

pub type Result<T = (), E = Error> = core::result::Result<T, E>;
