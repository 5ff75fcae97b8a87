use async_trait::async_trait;
use gloo_net::http::{Request, Response};
use serde::de::DeserializeOwned;
use toledoia_widget_core::{
    ApiError, ChatMessage, Endpoints, FileUpload, MessageExchange, NewSession, OutgoingMessage,
    Session, UploadExchange, WidgetBackend, WidgetIdentity,
};
use wasm_bindgen::JsValue;

/// Talks to the ToledoIA API with `fetch`.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    endpoints: Endpoints,
}

impl HttpBackend {
    pub fn new(api_base: &str) -> Self {
        Self { endpoints: Endpoints::new(api_base) }
    }
}

fn network(e: gloo_net::Error) -> ApiError {
    ApiError::Network(e.to_string())
}

fn js_error(e: JsValue) -> ApiError {
    ApiError::Network(format!("{e:?}"))
}

/// Turns non-2xx responses into [`ApiError::Status`] using the payload's `message`.
async fn check(resp: Response) -> Result<Response, ApiError> {
    if resp.ok() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::from_body(status, &body))
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    check(resp)
        .await?
        .json::<T>()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))
}

fn form_data(session_id: &str, file: &FileUpload) -> Result<web_sys::FormData, JsValue> {
    let form = web_sys::FormData::new()?;
    form.append_with_str("session_id", session_id)?;

    let bytes = js_sys::Uint8Array::from(file.bytes.as_slice());
    let parts = js_sys::Array::of1(&bytes);
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(&file.mime_type);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    form.append_with_blob_and_filename("file", &blob, &file.file_name)?;
    Ok(form)
}

#[async_trait(?Send)]
impl WidgetBackend for HttpBackend {
    async fn fetch_widget(&self, api_key: &str) -> Result<WidgetIdentity, ApiError> {
        let resp = Request::get(&self.endpoints.widget(api_key))
            .send()
            .await
            .map_err(network)?;
        read_json(resp).await
    }

    async fn find_active_session(
        &self,
        widget_id: &str,
        visitor_id: &str,
    ) -> Result<Option<Session>, ApiError> {
        let resp = Request::get(&self.endpoints.active_session(widget_id, visitor_id))
            .send()
            .await
            .map_err(network)?;
        if resp.status() == 404 {
            return Ok(None);
        }
        read_json(resp).await.map(Some)
    }

    async fn create_session(&self, request: &NewSession) -> Result<Session, ApiError> {
        let resp = Request::post(&self.endpoints.sessions())
            .json(request)
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;
        read_json(resp).await
    }

    async fn end_session(&self, session_id: &str) -> Result<(), ApiError> {
        let resp = Request::put(&self.endpoints.end_session(session_id))
            .send()
            .await
            .map_err(network)?;
        check(resp).await.map(|_| ())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let resp = Request::get(&self.endpoints.messages(session_id))
            .send()
            .await
            .map_err(network)?;
        read_json(resp).await
    }

    async fn send_message(&self, message: &OutgoingMessage) -> Result<MessageExchange, ApiError> {
        let resp = Request::post(&self.endpoints.send_message())
            .json(message)
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;
        read_json(resp).await
    }

    async fn upload_file(
        &self,
        session_id: &str,
        file: &FileUpload,
    ) -> Result<UploadExchange, ApiError> {
        let form = form_data(session_id, file).map_err(js_error)?;
        let resp = Request::post(&self.endpoints.upload())
            .body(form)
            .map_err(network)?
            .send()
            .await
            .map_err(network)?;
        read_json(resp).await
    }
}
