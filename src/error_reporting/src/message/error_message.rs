use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::exception::ExceptionInfo;
use super::request_context::HttpRequestContext;
use crate::config::ServiceContext;

/// Source location for reports that carry no usable stack trace.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    #[serde(skip_serializing_if = "HttpRequestContext::is_empty")]
    pub http_request: HttpRequestContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_location: Option<ReportLocation>,
}

impl ErrorContext {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One error report, built up through its setters and serialized as the
/// `events:report` request body.
///
/// The serialized `message` is the attached exception when there is one;
/// otherwise the free-text message followed by the call-site stack captured
/// when the report was created through the factory.
#[derive(Clone, Debug)]
pub struct ErrorMessage {
    event_time: DateTime<Utc>,
    service_context: ServiceContext,
    message: Option<String>,
    exception: Option<ExceptionInfo>,
    context: ErrorContext,
    auto_generated_stack_trace: Option<String>,
}

impl Default for ErrorMessage {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorMessage {
    pub fn new() -> Self {
        Self {
            event_time: Utc::now(),
            service_context: ServiceContext::default(),
            message: None,
            exception: None,
            context: ErrorContext::default(),
            auto_generated_stack_trace: None,
        }
    }

    pub fn set_event_time_to_now(&mut self) -> &mut Self {
        self.event_time = Utc::now();
        self
    }

    pub fn set_service_context(
        &mut self,
        service: impl Into<String>,
        version: Option<String>,
    ) -> &mut Self {
        self.service_context = ServiceContext {
            service: service.into(),
            version,
        };
        self
    }

    pub fn set_message(&mut self, message: impl Into<String>) -> &mut Self {
        self.message = Some(message.into());
        self
    }

    pub fn set_exception(&mut self, exception: ExceptionInfo) -> &mut Self {
        self.exception = Some(exception);
        self
    }

    pub fn set_http_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.context.http_request.method = Some(method.into());
        self
    }

    pub fn set_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.context.http_request.url = Some(url.into());
        self
    }

    pub fn set_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.context.http_request.user_agent = Some(user_agent.into());
        self
    }

    pub fn set_referrer(&mut self, referrer: impl Into<String>) -> &mut Self {
        self.context.http_request.referrer = Some(referrer.into());
        self
    }

    pub fn set_response_status_code(&mut self, status: u16) -> &mut Self {
        self.context.http_request.response_status_code = Some(status);
        self
    }

    pub fn set_remote_ip(&mut self, remote_ip: impl Into<String>) -> &mut Self {
        self.context.http_request.remote_ip = Some(remote_ip.into());
        self
    }

    pub fn set_user(&mut self, user: impl Into<String>) -> &mut Self {
        self.context.user = Some(user.into());
        self
    }

    pub fn set_file_path(&mut self, file_path: impl Into<String>) -> &mut Self {
        self.report_location_mut().file_path = Some(file_path.into());
        self
    }

    pub fn set_line_number(&mut self, line_number: u32) -> &mut Self {
        self.report_location_mut().line_number = Some(line_number);
        self
    }

    pub fn set_function_name(&mut self, function_name: impl Into<String>) -> &mut Self {
        self.report_location_mut().function_name = Some(function_name.into());
        self
    }

    /// Replaces the HTTP request context wholesale, e.g. with one extracted
    /// by a web framework.
    pub fn consume_request_information(&mut self, request: HttpRequestContext) -> &mut Self {
        self.context.http_request = request;
        self
    }

    pub(crate) fn set_auto_generated_stack_trace(&mut self, stack_trace: String) -> &mut Self {
        self.auto_generated_stack_trace = Some(stack_trace);
        self
    }

    fn report_location_mut(&mut self) -> &mut ReportLocation {
        self.context
            .report_location
            .get_or_insert_with(ReportLocation::default)
    }

    pub fn event_time(&self) -> DateTime<Utc> {
        self.event_time
    }

    pub fn service_context(&self) -> &ServiceContext {
        &self.service_context
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn exception(&self) -> Option<&ExceptionInfo> {
        self.exception.as_ref()
    }

    pub fn context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn auto_generated_stack_trace(&self) -> Option<&str> {
        self.auto_generated_stack_trace.as_deref()
    }

    /// The `message` field as it goes on the wire.
    ///
    /// An exception that carries its own stack is sent as is. One without a
    /// stack gets the call-site trace appended, like a free-text message.
    pub fn rendered_message(&self) -> String {
        let trace = self
            .auto_generated_stack_trace
            .as_deref()
            .filter(|trace| !trace.is_empty());

        if let Some(exception) = &self.exception {
            let has_own_stack = exception.stack().is_some_and(|stack| !stack.is_empty());
            return match trace {
                Some(trace) if !has_own_stack => format!("{}\n{}", exception, trace),
                _ => exception.to_string(),
            };
        }

        let message = self.message.as_deref().unwrap_or_default();
        match trace {
            Some(trace) if message.is_empty() => trace.to_string(),
            Some(trace) => format!("{}\n{}", message, trace),
            None => message.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WirePayload<'a> {
    event_time: &'a DateTime<Utc>,
    service_context: &'a ServiceContext,
    message: String,
    #[serde(skip_serializing_if = "context_is_empty")]
    context: &'a ErrorContext,
}

fn context_is_empty(context: &&ErrorContext) -> bool {
    context.is_empty()
}

impl Serialize for ErrorMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WirePayload {
            event_time: &self.event_time,
            service_context: &self.service_context,
            message: self.rendered_message(),
            context: &self.context,
        }
        .serialize(serializer)
    }
}
