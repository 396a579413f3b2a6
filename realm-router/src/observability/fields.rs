/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Value-format helpers for structured log fields.

use crate::control_plane::decorator::Decorator;

/// `handler@order` label for a decorator, used in pipeline events.
pub fn format_decorator(decorator: &Decorator) -> String {
    format!("{}@{}", decorator.handler(), decorator.order())
}

#[cfg(test)]
mod tests {
    use super::format_decorator;
    use crate::control_plane::decorator::{CallType, Decorator};

    #[test]
    fn decorator_label_carries_handler_and_order() {
        let decorator = Decorator::new("h.audit".into(), -3, CallType::Sync, 1);

        assert_eq!(format_decorator(&decorator), "h.audit@-3");
    }
}
