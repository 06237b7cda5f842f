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

//! Search driver: seeded construction followed by iterated local search.
//!
//! Construction fills the nights with blocks of each person's minimum
//! consecutive length and the weekend slots by least current load. The
//! improvement loop proposes block-level moves, accepts non-worsening
//! candidates, and perturbs from the incumbent when progress stalls. The
//! whole search runs under a wall-clock budget and polls the cooperative
//! cancellation flag.

use crate::model::options::SolveOptions;
use crate::model::staff::{Role, Staff};
use crate::scheduler::model_builder::RosterModel;
use crate::scheduler::score::{self, RosterState, Score};
use log::{debug, info};
use rand::Rng;
use rand::SeedableRng;
use rand::seq::IndexedRandom;
use rand_chacha::ChaCha20Rng;
use std::time::Instant;

const DEFAULT_SEED: u64 = 0x6E6F_7464;
/// Accepted-but-not-improving proposals before restarting from the incumbent.
const STALL_LIMIT: u64 = 2_000;

#[derive(Debug)]
pub struct SearchOutcome {
    pub best: Option<(RosterState, Score)>,
    pub iterations: u64,
    pub cancelled: bool,
}

pub fn run(model: &RosterModel, staff: &[Staff], options: &SolveOptions) -> SearchOutcome {
    let started = Instant::now();
    let mut rng = ChaCha20Rng::seed_from_u64(options.seed.unwrap_or(DEFAULT_SEED));

    let mut current = construct(model, staff);
    let mut current_score = score::evaluate(model, staff, &current);
    let mut best = (current.clone(), current_score);
    debug!(
        "initial roster: {} hard, {} soft",
        current_score.hard, current_score.soft
    );

    let mut iterations = 0u64;
    let mut stall = 0u64;
    let mut cancelled = false;

    loop {
        if best.1.cost() == 0 {
            break;
        }
        if let Some(max) = options.max_iterations {
            if iterations >= max {
                break;
            }
        }
        if iterations % 64 == 0 && started.elapsed() >= options.time_limit {
            break;
        }
        if iterations % 256 == 0 && options.is_cancelled() {
            cancelled = true;
            break;
        }
        iterations += 1;

        let candidate = propose(&current, model, staff, &mut rng);
        let candidate_score = score::evaluate(model, staff, &candidate);
        if candidate_score.cost() <= current_score.cost() {
            current = candidate;
            current_score = candidate_score;
            if current_score.cost() < best.1.cost() {
                best = (current.clone(), current_score);
                stall = 0;
                debug!(
                    "incumbent improved at iteration {}: {} hard, {} soft",
                    iterations, current_score.hard, current_score.soft
                );
                continue;
            }
        }
        stall += 1;
        if stall >= STALL_LIMIT {
            current = best.0.clone();
            perturb(&mut current, model, staff, &mut rng);
            current_score = score::evaluate(model, staff, &current);
            stall = 0;
        }
    }

    info!(
        "search finished after {} iterations in {:?}: {} hard, {} soft{}",
        iterations,
        started.elapsed(),
        best.1.hard,
        best.1.soft,
        if cancelled { " (cancelled)" } else { "" }
    );
    SearchOutcome {
        best: Some(best),
        iterations,
        cancelled,
    }
}

/// Deterministic greedy construction.
fn construct(model: &RosterModel, staff: &[Staff]) -> RosterState {
    let day_count = model.day_count as usize;
    let mut state = RosterState::empty(model);
    let mut night_count = vec![0u32; staff.len()];
    // 14-day block spacing, tracked optimistically during construction.
    let mut next_start = vec![0u32; staff.len()];

    for d in 0..day_count {
        if state.nights[d][0].is_some() {
            continue;
        }
        let mut chosen: Option<usize> = None;
        for &s in &model.nights[d].non_azubi {
            if (d as u32) < next_start[s] {
                continue;
            }
            let len = block_len(staff, s);
            if !fits_block(&state, model, s, d, len) {
                continue;
            }
            if chosen.is_none_or(|c| night_count[s] < night_count[c]) {
                chosen = Some(s);
            }
        }
        let Some(s) = chosen else {
            continue;
        };
        let len = block_len(staff, s);
        for k in 0..len {
            state.nights[d + k][0] = Some(s);
        }
        night_count[s] += len as u32;
        next_start[s] = d as u32 + 14;

        if needs_partner(staff, s, model, d, len) {
            if let Some(p) = pick_partner(&state, model, staff, d, len, &mut next_start, s) {
                for k in 0..len {
                    state.nights[d + k][1] = Some(p);
                }
                night_count[p] += len as u32;
            }
        }
    }

    // Leftover single nights no minimum-length block fits into: extend a
    // neighbouring run instead.
    for d in 0..day_count {
        if state.nights[d][0].is_none() {
            extend_into(&mut state, model, d);
        }
    }

    // Weekend slots by least current weekend load among candidates.
    let mut weekend_count = vec![0u32; staff.len()];
    let mut busy_day: Vec<Vec<bool>> = vec![vec![false; day_count]; staff.len()];
    for d in 0..day_count {
        for s in state.night_members(d) {
            busy_day[s][d] = true;
            if d + 1 < day_count {
                busy_day[s][d + 1] = true;
            }
            if d > 0 {
                busy_day[s][d - 1] = true;
            }
        }
    }
    for (i, slot) in model.weekend_slots.iter().enumerate() {
        let d = slot.day as usize;
        let mut chosen: Option<usize> = None;
        for &s in &slot.candidates {
            if busy_day[s][d] || (d as u32) < next_start[s] {
                continue;
            }
            if chosen.is_none_or(|c| weekend_count[s] < weekend_count[c]) {
                chosen = Some(s);
            }
        }
        // Fall back to any candidate rather than leaving the slot uncovered.
        let chosen = chosen.or_else(|| slot.candidates.first().copied());
        if let Some(s) = chosen {
            state.weekend[i] = Some(s);
            weekend_count[s] += 1;
            next_start[s] = slot.day + 14;
            busy_day[s][d] = true;
            if d > 0 {
                busy_day[s][d - 1] = true;
            }
            if d + 1 < day_count {
                busy_day[s][d + 1] = true;
            }
        }
    }
    state
}

fn block_len(staff: &[Staff], s: usize) -> usize {
    (staff[s].nd_min_consecutive as usize).max(1)
}

/// Whether `s` can take the nights `d..d+len` (eligible and still empty).
fn fits_block(state: &RosterState, model: &RosterModel, s: usize, d: usize, len: usize) -> bool {
    if d + len > model.day_count as usize {
        return false;
    }
    (0..len).all(|k| model.night_days[s].contains((d + k) as u32) && state.nights[d + k][0].is_none())
}

/// A primary with `nd_alone = false` needs a partner on every regular night
/// of the block.
fn needs_partner(staff: &[Staff], s: usize, model: &RosterModel, d: usize, len: usize) -> bool {
    !staff[s].nd_alone && (0..len).any(|k| model.nights[d + k].kind.is_regular_night())
}

/// Picks a partner covering the whole block. Azubis first (legal on every
/// night kind); a second non-Azubi is only legal when the block touches no
/// Sun→Mon or Mon→Tue night.
fn pick_partner(
    state: &RosterState,
    model: &RosterModel,
    staff: &[Staff],
    d: usize,
    len: usize,
    next_start: &mut [u32],
    primary: usize,
) -> Option<usize> {
    let candidate = {
        let free = |s: usize| {
            s != primary
                && (d as u32) >= next_start[s]
                && (0..len).all(|k| {
                    model.night_days[s].contains((d + k) as u32) && state.nights[d + k][1].is_none()
                })
        };
        model.nights[d]
            .azubi
            .iter()
            .copied()
            .find(|&s| free(s))
            .or_else(|| {
                if (0..len).any(|k| model.nights[d + k].kind.is_vet_night()) {
                    return None;
                }
                model.nights[d]
                    .non_azubi
                    .iter()
                    .copied()
                    .find(|&s| free(s) && !staff[s].nd_alone && block_len(staff, s) <= len)
            })
    };
    if let Some(p) = candidate {
        next_start[p] = d as u32 + 14;
    }
    candidate
}

/// Extends the run adjacent to the empty day `d` over it, partner included,
/// when the holder is eligible. Returns whether the night got covered.
fn extend_into(state: &mut RosterState, model: &RosterModel, d: usize) -> bool {
    let day_count = model.day_count as usize;
    let neighbours = [d.checked_sub(1), (d + 1 < day_count).then_some(d + 1)];
    for n in neighbours.into_iter().flatten() {
        let Some(s) = state.nights[n][0] else {
            continue;
        };
        if !model.night_days[s].contains(d as u32) {
            continue;
        }
        state.nights[d][0] = Some(s);
        if let Some(p) = state.nights[n][1] {
            if model.night_days[p].contains(d as u32) {
                state.nights[d][1] = Some(p);
            }
        }
        return true;
    }
    false
}

#[derive(Clone, Copy, Debug)]
enum MoveKind {
    RebuildNightRun,
    ClearNightRun,
    FillEmptyNight,
    ExtendRun,
    TogglePartner,
    ChangeWeekend,
    SwapWeekend,
}

const MOVES: [(MoveKind, u32); 7] = [
    (MoveKind::RebuildNightRun, 4),
    (MoveKind::ClearNightRun, 1),
    (MoveKind::FillEmptyNight, 4),
    (MoveKind::ExtendRun, 2),
    (MoveKind::TogglePartner, 3),
    (MoveKind::ChangeWeekend, 3),
    (MoveKind::SwapWeekend, 2),
];

fn propose(current: &RosterState, model: &RosterModel, staff: &[Staff], rng: &mut ChaCha20Rng) -> RosterState {
    let mut next = current.clone();
    let kind = MOVES
        .choose_weighted(rng, |(_, w)| *w)
        .expect("move table is not empty")
        .0;
    match kind {
        MoveKind::RebuildNightRun => {
            let d = rng.random_range(0..model.day_count as usize);
            if let Some((start, len)) = primary_run(&next, d) {
                clear_run(&mut next, start, len);
                place_random_block(&mut next, model, staff, start, rng);
            }
        }
        MoveKind::ClearNightRun => {
            let d = rng.random_range(0..model.day_count as usize);
            if let Some((start, len)) = primary_run(&next, d) {
                clear_run(&mut next, start, len);
            }
        }
        MoveKind::FillEmptyNight => {
            let empty: Vec<usize> = (0..model.day_count as usize)
                .filter(|&d| next.nights[d][0].is_none())
                .collect();
            if let Some(&d) = empty.choose(rng) {
                place_random_block(&mut next, model, staff, d, rng);
            }
        }
        MoveKind::ExtendRun => {
            let empty: Vec<usize> = (0..model.day_count as usize)
                .filter(|&d| next.nights[d][0].is_none())
                .collect();
            if let Some(&d) = empty.choose(rng) {
                extend_into(&mut next, model, d);
            }
        }
        MoveKind::TogglePartner => {
            let d = rng.random_range(0..model.day_count as usize);
            if let Some((start, len)) = primary_run(&next, d) {
                if next.nights[d][1].is_some() {
                    for k in start..start + len {
                        next.nights[k][1] = None;
                    }
                } else {
                    attach_random_partner(&mut next, model, staff, start, len, rng);
                }
            }
        }
        MoveKind::ChangeWeekend => {
            if !model.weekend_slots.is_empty() {
                let i = rng.random_range(0..model.weekend_slots.len());
                if let Some(&s) = model.weekend_slots[i].candidates.choose(rng) {
                    next.weekend[i] = Some(s);
                }
            }
        }
        MoveKind::SwapWeekend => {
            if model.weekend_slots.len() >= 2 {
                let a = rng.random_range(0..model.weekend_slots.len());
                let b = rng.random_range(0..model.weekend_slots.len());
                let (ha, hb) = (next.weekend[a], next.weekend[b]);
                let a_ok = hb.is_none_or(|s| model.weekend_slots[a].candidates.contains(&s));
                let b_ok = ha.is_none_or(|s| model.weekend_slots[b].candidates.contains(&s));
                if a != b && a_ok && b_ok {
                    next.weekend[a] = hb;
                    next.weekend[b] = ha;
                }
            }
        }
    }
    next
}

/// The maximal primary run covering day `d`, if that night is staffed.
fn primary_run(state: &RosterState, d: usize) -> Option<(usize, usize)> {
    let holder = state.nights[d][0]?;
    let mut start = d;
    while start > 0 && state.nights[start - 1][0] == Some(holder) {
        start -= 1;
    }
    let mut end = d;
    while end + 1 < state.nights.len() && state.nights[end + 1][0] == Some(holder) {
        end += 1;
    }
    Some((start, end - start + 1))
}

fn clear_run(state: &mut RosterState, start: usize, len: usize) {
    for d in start..start + len {
        state.nights[d] = [None, None];
    }
}

fn place_random_block(
    state: &mut RosterState,
    model: &RosterModel,
    staff: &[Staff],
    d: usize,
    rng: &mut ChaCha20Rng,
) {
    let Some(&s) = model.nights[d].non_azubi.choose(rng) else {
        return;
    };
    let len = block_len(staff, s);
    if !fits_block(state, model, s, d, len) {
        return;
    }
    for k in 0..len {
        state.nights[d + k][0] = Some(s);
    }
    if needs_partner(staff, s, model, d, len) {
        attach_random_partner(state, model, staff, d, len, rng);
    }
}

fn attach_random_partner(
    state: &mut RosterState,
    model: &RosterModel,
    staff: &[Staff],
    start: usize,
    len: usize,
    rng: &mut ChaCha20Rng,
) {
    let Some(primary) = state.nights[start][0] else {
        return;
    };
    let free = |s: usize| {
        s != primary && (0..len).all(|k| model.night_days[s].contains((start + k) as u32))
    };
    let touches_vet_night = (0..len).any(|k| model.nights[start + k].kind.is_vet_night());
    let mut pool: Vec<usize> = model.nights[start].azubi.iter().copied().filter(|&s| free(s)).collect();
    if !touches_vet_night {
        pool.extend(
            model.nights[start]
                .non_azubi
                .iter()
                .copied()
                .filter(|&s| free(s) && !staff[s].nd_alone && staff[s].role != Role::Azubi),
        );
    }
    if let Some(&p) = pool.choose(rng) {
        for k in 0..len {
            state.nights[start + k][1] = Some(p);
        }
    }
}

/// Escape a stall: clear a few runs and re-roll a weekend slot, then let the
/// improvement loop rebuild.
fn perturb(state: &mut RosterState, model: &RosterModel, staff: &[Staff], rng: &mut ChaCha20Rng) {
    let day_count = model.day_count as usize;
    for _ in 0..3 {
        let d = rng.random_range(0..day_count);
        if let Some((start, len)) = primary_run(state, d) {
            clear_run(state, start, len);
        }
    }
    let empty: Vec<usize> = (0..day_count).filter(|&d| state.nights[d][0].is_none()).collect();
    if let Some(&d) = empty.choose(rng) {
        place_random_block(state, model, staff, d, rng);
    }
    if !model.weekend_slots.is_empty() {
        let i = rng.random_range(0..model.weekend_slots.len());
        if let Some(&s) = model.weekend_slots[i].candidates.choose(rng) {
            state.weekend[i] = Some(s);
        }
    }
}
