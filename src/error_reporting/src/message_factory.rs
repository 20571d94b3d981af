use crate::config::{Configuration, ServiceContext};
use crate::message::ErrorMessage;
use crate::stack_trace::build_stack_trace;

/// Returns a factory bound to `config`'s service context.
///
/// Every call captures the stack at that moment, so the report points at
/// the code that created it rather than the code that later sends it.
pub fn make_factory(config: &Configuration) -> impl Fn() -> ErrorMessage + Clone + Send + Sync {
    let service_context = config.service_context().clone();
    move || new_error_message(&service_context)
}

fn new_error_message(service_context: &ServiceContext) -> ErrorMessage {
    let stack_trace = build_stack_trace("");

    let mut message = ErrorMessage::new();
    message
        .set_service_context(
            service_context.service.clone(),
            service_context.version.clone(),
        )
        .set_auto_generated_stack_trace(stack_trace);
    message
}
