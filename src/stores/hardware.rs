// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Optional hardware: UPS power and GPIO header
//!
//! Boards without the hardware answer 501/503; those resources are
//! suppressed for a while instead of being polled every cycle.

use std::sync::Arc;

use crate::cache::{PollOutcome, Presence, ResourceCache, ResourceQuery, from_json};
use crate::client::ResourceClient;
use crate::config::CachePolicy;
use crate::error::ApiError;

use super::types::{GpioPin, PowerStatus, parse_gpio};

pub const POWER_PATH: &str = "/api/v1/hardware/power";
pub const GPIO_PATH: &str = "/api/v1/hardware/gpio";

pub struct HardwareStore<C> {
    power: ResourceCache<C, PowerStatus>,
    gpio: ResourceCache<C, Vec<GpioPin>>,
}

impl<C: ResourceClient> HardwareStore<C> {
    pub fn new(client: Arc<C>, policy: CachePolicy) -> Self {
        Self {
            power: ResourceCache::new("power", Arc::clone(&client), from_json, policy),
            gpio: ResourceCache::new("gpio", client, parse_gpio, policy),
        }
    }

    pub async fn poll_power(&self) -> PollOutcome<PowerStatus> {
        self.power.poll(&ResourceQuery::new(POWER_PATH)).await
    }

    pub async fn poll_gpio(&self) -> PollOutcome<Vec<GpioPin>> {
        self.gpio.poll(&ResourceQuery::new(GPIO_PATH)).await
    }

    /// Explicit reload; an absent UPS is reported to the caller
    pub async fn refresh_power(&self) -> Result<PowerStatus, ApiError> {
        self.power.fetch(&ResourceQuery::new(POWER_PATH), true).await
    }

    pub async fn power(&self) -> Option<PowerStatus> {
        self.power.value(&ResourceQuery::new(POWER_PATH)).await
    }

    pub async fn gpio(&self) -> Vec<GpioPin> {
        self.gpio
            .value(&ResourceQuery::new(GPIO_PATH))
            .await
            .unwrap_or_default()
    }

    pub async fn power_presence(&self) -> Presence {
        self.power.presence(&ResourceQuery::new(POWER_PATH)).await
    }

    pub async fn gpio_presence(&self) -> Presence {
        self.gpio.presence(&ResourceQuery::new(GPIO_PATH)).await
    }

    pub fn power_cache(&self) -> &ResourceCache<C, PowerStatus> {
        &self.power
    }

    pub fn gpio_cache(&self) -> &ResourceCache<C, Vec<GpioPin>> {
        &self.gpio
    }
}
