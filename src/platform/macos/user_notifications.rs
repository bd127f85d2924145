use block2::{DynBlock, RcBlock};
use objc2::rc::Retained;
use objc2::runtime::{AnyObject, Bool, ProtocolObject};
use objc2::{AnyThread, DefinedClass, MainThreadMarker, define_class, msg_send};
use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy};
use objc2_foundation::{NSDictionary, NSError, NSObject, NSObjectProtocol, NSString, NSUUID};
use objc2_user_notifications::{
    UNAuthorizationOptions, UNMutableNotificationContent, UNNotification,
    UNNotificationDefaultActionIdentifier, UNNotificationPresentationOptions, UNNotificationRequest,
    UNNotificationResponse, UNNotificationSound, UNUserNotificationCenter,
    UNUserNotificationCenterDelegate,
};
use std::{
    collections::HashMap,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    time::{Duration, Instant},
};
use tracing::{Level, debug, info, instrument, warn};

use super::run_loop_for;
use crate::config::{DELIVERY_TIMEOUT, RUN_LOOP_SLICE};
use crate::notification::{ClickEvent, Delivery, Notification, NotificationCenterApi};

#[derive(Debug)]
struct DelegateIvars {
    clicks: Sender<ClickEvent>,
}

define_class!(
    #[unsafe(super(NSObject))]
    #[name = "ClaudeNotifierDelegate"]
    #[ivars = DelegateIvars]
    struct NotificationDelegate;

    unsafe impl NSObjectProtocol for NotificationDelegate {}

    unsafe impl UNUserNotificationCenterDelegate for NotificationDelegate {
        #[unsafe(method(userNotificationCenter:willPresentNotification:withCompletionHandler:))]
        fn will_present(
            &self,
            _center: &UNUserNotificationCenter,
            _notification: &UNNotification,
            completion: &DynBlock<dyn Fn(UNNotificationPresentationOptions)>,
        ) {
            completion.call((
                UNNotificationPresentationOptions::Banner | UNNotificationPresentationOptions::Sound,
            ));
        }

        #[unsafe(method(userNotificationCenter:didReceiveNotificationResponse:withCompletionHandler:))]
        fn did_receive(
            &self,
            _center: &UNUserNotificationCenter,
            response: &UNNotificationResponse,
            completion: &DynBlock<dyn Fn()>,
        ) {
            let action = unsafe { response.actionIdentifier() };
            if action.isEqualToString(unsafe { UNNotificationDefaultActionIdentifier }) {
                let user_info = unsafe { response.notification().request().content().userInfo() };
                let click = ClickEvent {
                    user_info: string_entries(&user_info),
                };
                if self.ivars().clicks.send(click).is_err() {
                    debug!("click arrived after the wait ended");
                }
            } else {
                debug!("ignoring notification action {action}");
            }
            completion.call(());
        }
    }
);

impl NotificationDelegate {
    fn new(clicks: Sender<ClickEvent>) -> Retained<Self> {
        let this = Self::alloc().set_ivars(DelegateIvars { clicks });
        unsafe { msg_send![super(this), init] }
    }
}

/// String keys and values of a user-info dictionary. Other entries are skipped.
fn string_entries(dictionary: &NSDictionary) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    for key in dictionary.allKeys().iter() {
        let Some(name) = key.downcast_ref::<NSString>() else {
            continue;
        };
        let value = unsafe { dictionary.objectForKey(&key) };
        if let Some(value) = value.as_deref().and_then(AnyObject::downcast_ref::<NSString>) {
            entries.insert(name.to_string(), value.to_string());
        }
    }
    entries
}

fn user_info_dictionary(user_info: &HashMap<String, String>) -> Retained<NSDictionary> {
    let keys = user_info
        .keys()
        .map(|key| NSString::from_str(key))
        .collect::<Vec<_>>();
    let values = user_info
        .values()
        .map(|value| NSString::from_str(value))
        .collect::<Vec<_>>();
    let dictionary = NSDictionary::from_slices(
        &keys.iter().map(|key| &**key).collect::<Vec<_>>(),
        &values.iter().map(|value| &**value).collect::<Vec<_>>(),
    );
    unsafe { Retained::cast_unchecked(dictionary) }
}

fn error_text(error: *mut NSError) -> Option<String> {
    unsafe { error.as_ref() }.map(|error| error.localizedDescription().to_string())
}

/// `UNUserNotificationCenter` with a delegate that forwards body clicks.
pub struct NotificationCenterOS {
    center: Retained<UNUserNotificationCenter>,
    clicks: Receiver<ClickEvent>,
    // The center only holds a weak reference.
    _delegate: Retained<NotificationDelegate>,
}

impl NotificationCenterOS {
    pub fn new() -> Self {
        if let Some(mtm) = MainThreadMarker::new() {
            let app = NSApplication::sharedApplication(mtm);
            app.setActivationPolicy(NSApplicationActivationPolicy::Accessory);
            // Notification responses are only delivered to a launched application.
            unsafe { app.finishLaunching() };
        } else {
            warn!("not on the main thread, clicks may not be delivered");
        }

        let (tx, clicks) = mpsc::channel();
        let delegate = NotificationDelegate::new(tx);
        let center = unsafe { UNUserNotificationCenter::currentNotificationCenter() };
        unsafe { center.setDelegate(Some(ProtocolObject::from_ref(&*delegate))) };
        Self {
            center,
            clicks,
            _delegate: delegate,
        }
    }

    fn authorize(&self, deadline: Instant) -> Delivery {
        let (tx, rx) = mpsc::channel();
        let completion = RcBlock::new(move |granted: Bool, error: *mut NSError| {
            let _ = tx.send((granted.as_bool(), error_text(error)));
        });
        unsafe {
            self.center.requestAuthorizationWithOptions_completionHandler(
                UNAuthorizationOptions::Alert | UNAuthorizationOptions::Sound,
                &*completion,
            );
        }
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok((true, _)) => Delivery::Confirmed,
            Ok((false, Some(error))) => {
                warn!("authorization failed: {error}");
                Delivery::Failed
            }
            Ok((false, None)) => Delivery::Denied,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Delivery::TimedOut,
        }
    }

    fn add(&self, notification: &Notification, deadline: Instant) -> Delivery {
        let content = UNMutableNotificationContent::new();
        unsafe {
            content.setTitle(&NSString::from_str(&notification.title));
            content.setBody(&NSString::from_str(&notification.body));
            if let Some(subtitle) = &notification.subtitle {
                content.setSubtitle(&NSString::from_str(subtitle));
            }
            if let Some(sound) = &notification.sound {
                let sound = UNNotificationSound::soundNamed(&NSString::from_str(sound));
                content.setSound(Some(&sound));
            }
            content.setUserInfo(&user_info_dictionary(&notification.user_info));
        }

        let identifier = NSUUID::UUID().UUIDString();
        let request = unsafe {
            UNNotificationRequest::requestWithIdentifier_content_trigger(&identifier, &content, None)
        };

        let (tx, rx) = mpsc::channel();
        let completion = RcBlock::new(move |error: *mut NSError| {
            let _ = tx.send(error_text(error));
        });
        unsafe {
            self.center
                .addNotificationRequest_withCompletionHandler(&request, Some(&*completion));
        }
        match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(None) => Delivery::Confirmed,
            Ok(Some(error)) => {
                warn!("delivery failed: {error}");
                Delivery::Failed
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Delivery::TimedOut,
        }
    }
}

impl Default for NotificationCenterOS {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenterApi for NotificationCenterOS {
    #[instrument(level = Level::DEBUG, skip_all, fields(title = %notification.title))]
    fn post(&self, notification: &Notification) -> Delivery {
        let deadline = Instant::now() + DELIVERY_TIMEOUT;
        let authorization = self.authorize(deadline);
        if authorization != Delivery::Confirmed {
            warn!("notifications not authorized: {authorization:?}");
            return authorization;
        }
        let delivery = self.add(notification, deadline);
        info!("notification posted: {delivery:?}");
        delivery
    }

    fn wait_for_click(&self, timeout: Duration) -> Option<ClickEvent> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(click) = self.clicks.try_recv() {
                return Some(click);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            run_loop_for(remaining.min(RUN_LOOP_SLICE));
        }
    }

    fn withdraw_all(&self) {
        unsafe { self.center.removeAllDeliveredNotifications() };
    }

    fn pump(&self, duration: Duration) {
        run_loop_for(duration);
    }
}
