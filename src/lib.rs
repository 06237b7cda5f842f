/*
 * Copyright (c) 2025 Clément GRENNERAT
 *
 * This program is free software: you can redistribute it and/or modify it under the terms of the
 * GNU General Public License as published by the Free Software Foundation, version 3.
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
 * even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
 * See the GNU General Public License for more details.
 * You should have received a copy of the GNU General Public License along with this program.
 * If not, see https://www.gnu.org/licenses/.
 *
 */

//! On-call duty roster engine for a veterinary clinic.
//!
//! Given a staff roster, a quarter start date and a vacation mapping, the engine
//! assigns staff to the weekend daytime slots and to one or two slots per night
//! of the quarter, honouring the clinic's eligibility, pairing, rest and
//! capacity rules while balancing the workload inside each role group.
//!
//! The entry point is [`scheduler::solve`]; everything it returns is carried in
//! a [`model::result::SolveResult`] envelope. An independent validator
//! ([`scheduler::validator::validate`]) re-checks every roster the engine emits.

pub mod model;
pub mod scheduler;
