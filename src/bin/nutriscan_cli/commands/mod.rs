// ABOUTME: Command implementations for nutriscan-cli
// ABOUTME: One module per command family
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

pub mod identify;
