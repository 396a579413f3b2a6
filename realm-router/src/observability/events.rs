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

//! Canonical structured event names used across `realm-router`.

// Session lifecycle and peer link events.
pub const SESSION_ATTACH: &str = "session_attach";
pub const SESSION_DETACH: &str = "session_detach";
pub const SESSION_RECEIVE: &str = "session_receive";
pub const SESSION_UNEXPECTED_MESSAGE: &str = "session_unexpected_message";
pub const PEER_SEND_DROPPED: &str = "peer_send_dropped";
pub const PEER_SEND_CLOSED: &str = "peer_send_closed";

// Dealer and broker routing events.
pub const REGISTER_OK: &str = "register_ok";
pub const REGISTER_FAILED: &str = "register_failed";
pub const UNREGISTER_OK: &str = "unregister_ok";
pub const CALL_NO_SUCH_PROCEDURE: &str = "call_no_such_procedure";
pub const YIELD_UNKNOWN_REQUEST: &str = "yield_unknown_request";
pub const YIELD_WRONG_CALLEE: &str = "yield_wrong_callee";
pub const INVOCATION_CANCELED: &str = "invocation_canceled";
pub const SUBSCRIBE_OK: &str = "subscribe_ok";
pub const UNSUBSCRIBE_OK: &str = "unsubscribe_ok";
pub const PUBLISH_DELIVERED: &str = "publish_delivered";

// Decorator control-plane events.
pub const DECORATOR_ADD_START: &str = "decorator_add_start";
pub const DECORATOR_ADD_OK: &str = "decorator_add_ok";
pub const DECORATOR_ADD_FAILED: &str = "decorator_add_failed";
pub const DECORATOR_REMOVE_START: &str = "decorator_remove_start";
pub const DECORATOR_REMOVE_OK: &str = "decorator_remove_ok";
pub const DECORATOR_REMOVE_FAILED: &str = "decorator_remove_failed";

// Interception pipeline events.
pub const PIPELINE_STAGE_START: &str = "pipeline_stage_start";
pub const PIPELINE_STAGE_ABORT: &str = "pipeline_stage_abort";
pub const PIPELINE_STAGE_REDIRECT: &str = "pipeline_stage_redirect";
pub const PIPELINE_ASYNC_HANDLER_FAILED: &str = "pipeline_async_handler_failed";

// Runtime events.
pub const ACTION_LOOP_START: &str = "action_loop_start";
pub const ACTION_LOOP_STOP: &str = "action_loop_stop";
pub const RUNTIME_THREAD_NAME_FALLBACK: &str = "runtime_thread_name_fallback";
pub const RUNTIME_SPAWN_START: &str = "runtime_spawn_start";
pub const RUNTIME_SPAWN_OK: &str = "runtime_spawn_ok";
pub const RUNTIME_SPAWN_FAILED: &str = "runtime_spawn_failed";
pub const REALM_START: &str = "realm_start";
pub const CONFIG_LOAD_FAILED: &str = "config_load_failed";
