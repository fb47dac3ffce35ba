use tokio::sync::watch;

/// a value that can be watched for changes.
///
/// writes never fail, whether anybody is subscribed or not.
#[derive(Debug)]
pub struct Observable<T>(watch::Sender<T>);

impl<T> Observable<T> {
    pub fn new(value: T) -> Self { Self(watch::channel(value).0) }

    pub fn get(&self) -> T
    where T: Clone {
        self.0.borrow().clone()
    }

    /// reads in place, without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R { f(&self.0.borrow()) }

    pub fn set(&self, value: T) { self.0.send_replace(value); }

    pub fn update(&self, f: impl FnOnce(&mut T)) { self.0.send_modify(f) }

    pub fn subscribe(&self) -> watch::Receiver<T> { self.0.subscribe() }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self { Self::new(T::default()) }
}
