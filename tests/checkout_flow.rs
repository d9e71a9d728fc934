//! End-to-end checkout and payment watching against a mock storefront.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

use pix_watch::payments::{Approval, OrderId, OrderSummary, WatchEvent, WatchPhase};
use pix_watch::storefront::{CheckoutForm, SaleForm, SaleItem};
use pix_watch::{CheckoutController, WatchError};

mod common;
use common::MockRequest;

const PIX_RECEIPT: &str = r#"{
    "order_id": 42,
    "message": "Pedido criado com sucesso.",
    "status_label": "Aguardando pagamento",
    "pix_code": "00020126580014br.gov.bcb.pix",
    "qr_code_base64": "iVBORw0KGgo=",
    "cart": {"items": [], "total": "0.00", "count": 0},
    "order_summary": {"customer_name": "Ana Souza", "whatsapp": "11999990000", "total": "59.90"}
}"#;

async fn next_event(rx: &mut mpsc::UnboundedReceiver<WatchEvent>) -> WatchEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for watcher event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_checkout_watches_until_paid() {
    let status_calls = Arc::new(AtomicU32::new(0));
    let requests: Arc<Mutex<Vec<MockRequest>>> = Arc::default();

    let sc = status_calls.clone();
    let log = requests.clone();
    let addr = common::start_programmable_storefront(move |req| {
        log.lock().unwrap().push(req.clone());
        match (req.method.as_str(), req.path.as_str()) {
            ("POST", "/checkout/finalize/") => (200, PIX_RECEIPT.to_string()),
            ("GET", "/checkout/status/42/") => {
                if sc.fetch_add(1, Ordering::SeqCst) == 0 {
                    (200, r#"{"is_paid": false, "status_label": "Aguardando pagamento", "order_id": 42}"#.into())
                } else {
                    (200, r#"{"is_paid": true, "status_label": "Pago", "order_id": 42}"#.into())
                }
            }
            _ => (404, r#"{"error": "not found"}"#.into()),
        }
    })
    .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = CheckoutController::from_config(&common::config_for(addr, 100), Arc::new(tx)).unwrap();

    let form = CheckoutForm {
        first_name: "Ana".into(),
        last_name: "Souza".into(),
        whatsapp: "11999990000".into(),
        payment_method: "pix".into(),
    };
    let receipt = controller.submit_checkout(&form).await.unwrap();
    assert_eq!(receipt.order_id, OrderId::from(42));
    assert_eq!(receipt.status_label, "Aguardando pagamento");
    assert_eq!(controller.pix_code().unwrap(), "00020126580014br.gov.bcb.pix");

    match next_event(&mut rx).await {
        WatchEvent::StatusChanged(report) => assert_eq!(report.label, "Aguardando pagamento"),
        other => panic!("unexpected event {:?}", other),
    }
    match next_event(&mut rx).await {
        WatchEvent::StatusChanged(report) => assert_eq!(report.label, "Pago"),
        other => panic!("unexpected event {:?}", other),
    }
    assert_eq!(
        next_event(&mut rx).await,
        WatchEvent::Approved(Approval {
            order_id: OrderId::from(42),
            label: "Pago".into(),
            summary: Some(OrderSummary {
                customer_name: "Ana Souza".into(),
                contact: "11999990000".into(),
                total: "59.90".into(),
            }),
        })
    );

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(status_calls.load(Ordering::SeqCst), 2, "polling stops once paid");
    assert!(rx.try_recv().is_err());
    assert_eq!(controller.watcher().phase(), WatchPhase::Approved);

    let requests = requests.lock().unwrap();
    let finalize = requests.iter().find(|r| r.method == "POST").unwrap();
    assert_eq!(finalize.header("X-CSRFToken"), Some("test-csrf"));
    assert!(finalize.body.contains("first_name=Ana"));
    assert!(finalize.body.contains("payment_method=pix"));
    let status = requests.iter().find(|r| r.method == "GET").unwrap();
    assert_eq!(status.header("X-Requested-With"), Some("XMLHttpRequest"));
    assert!(status.header("x-request-id").is_some());
}

#[tokio::test]
async fn test_status_error_stops_watch() {
    let status_calls = Arc::new(AtomicU32::new(0));
    let sc = status_calls.clone();
    let addr = common::start_programmable_storefront(move |req| match req.method.as_str() {
        "POST" => (200, PIX_RECEIPT.to_string()),
        _ => {
            sc.fetch_add(1, Ordering::SeqCst);
            (500, r#"{"error": "Falha ao consultar o gateway."}"#.into())
        }
    })
    .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = CheckoutController::from_config(&common::config_for(addr, 100), Arc::new(tx)).unwrap();
    controller.submit_checkout(&CheckoutForm::default()).await.unwrap();

    assert_eq!(
        next_event(&mut rx).await,
        WatchEvent::Failed {
            order_id: OrderId::from(42),
            message: "Falha ao consultar o gateway.".into(),
        }
    );

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(status_calls.load(Ordering::SeqCst), 1, "no automatic retry");
    assert_eq!(controller.watcher().phase(), WatchPhase::Failed);

    controller.close();
    assert_eq!(controller.watcher().phase(), WatchPhase::Idle);
}

#[tokio::test]
async fn test_close_stops_polling() {
    let status_calls = Arc::new(AtomicU32::new(0));
    let sc = status_calls.clone();
    let addr = common::start_programmable_storefront(move |req| match req.method.as_str() {
        "POST" => (200, PIX_RECEIPT.to_string()),
        _ => {
            sc.fetch_add(1, Ordering::SeqCst);
            (200, r#"{"is_paid": false}"#.into())
        }
    })
    .await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let controller = CheckoutController::from_config(&common::config_for(addr, 100), Arc::new(tx)).unwrap();
    controller.submit_checkout(&CheckoutForm::default()).await.unwrap();

    next_event(&mut rx).await;
    controller.close();
    let calls_at_close = status_calls.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(status_calls.load(Ordering::SeqCst), calls_at_close);
    assert_eq!(controller.watcher().phase(), WatchPhase::Idle);
    assert_eq!(controller.watcher().order_id(), None);
}

#[tokio::test]
async fn test_paid_cash_sale_is_not_watched() {
    let requests: Arc<Mutex<Vec<MockRequest>>> = Arc::default();
    let log = requests.clone();
    let addr = common::start_programmable_storefront(move |req| {
        log.lock().unwrap().push(req);
        (
            200,
            r#"{"order_id": 77, "message": "Venda finalizada.", "status_label": "Pago",
                "is_paid": true, "print_url": "/manage/sales/77/print/"}"#
                .into(),
        )
    })
    .await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let controller = CheckoutController::from_config(&common::config_for(addr, 100), Arc::new(tx)).unwrap();

    let form = SaleForm {
        customer_name: "Balcao".into(),
        whatsapp: String::new(),
        payment_method: "cash".into(),
        mark_paid_now: true,
        items: vec![SaleItem {
            product_id: 3,
            variant_id: Some(8),
            quantity: 2,
        }],
    };
    let receipt = controller.submit_sale(&form).await.unwrap();

    assert_eq!(receipt.print_url.as_deref(), Some("/manage/sales/77/print/"));
    assert_eq!(controller.watcher().phase(), WatchPhase::Idle);
    assert_eq!(controller.current_order(), Some(OrderId::from(77)));
    assert!(matches!(controller.pix_code(), Err(WatchError::PixCodeUnavailable)));

    let requests = requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].path, "/manage/sales/create/");
    assert!(requests[0].body.contains("mark_paid_now=true"));
    assert!(requests[0].body.contains("items_json="));
}

#[tokio::test]
async fn test_mark_paid_stops_watch() {
    let addr = common::start_programmable_storefront(move |req| {
        match (req.method.as_str(), req.path.as_str()) {
            ("POST", "/manage/sales/create/") => (200, PIX_RECEIPT.to_string()),
            ("POST", "/manage/sales/42/mark-paid/") => {
                (200, r#"{"message": "Venda #42 marcada como paga."}"#.into())
            }
            _ => (200, r#"{"is_paid": false}"#.into()),
        }
    })
    .await;

    let (tx, _rx) = mpsc::unbounded_channel();
    let controller = CheckoutController::from_config(&common::config_for(addr, 100), Arc::new(tx)).unwrap();

    let form = SaleForm {
        customer_name: "Joao".into(),
        payment_method: "pix".into(),
        items: vec![SaleItem {
            product_id: 1,
            variant_id: None,
            quantity: 1,
        }],
        ..SaleForm::default()
    };
    controller.submit_sale(&form).await.unwrap();
    assert!(controller.watcher().is_active());

    let response = controller.mark_paid().await.unwrap();
    assert_eq!(response.message.as_deref(), Some("Venda #42 marcada como paga."));
    assert_eq!(controller.watcher().phase(), WatchPhase::Idle);
}
